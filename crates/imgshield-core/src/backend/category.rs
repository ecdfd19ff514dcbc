use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed set of harm categories every backend reports against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gore,
    Violence,
    Death,
    Disturbing,
    Insects,
    Medical,
    Shock,
    AnimalCruelty,
    NsfwExplicit,
    NsfwSuggestive,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Gore,
        Category::Violence,
        Category::Death,
        Category::Disturbing,
        Category::Insects,
        Category::Medical,
        Category::Shock,
        Category::AnimalCruelty,
        Category::NsfwExplicit,
        Category::NsfwSuggestive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Gore => "gore",
            Category::Violence => "violence",
            Category::Death => "death",
            Category::Disturbing => "disturbing",
            Category::Insects => "insects",
            Category::Medical => "medical",
            Category::Shock => "shock",
            Category::AnimalCruelty => "animal_cruelty",
            Category::NsfwExplicit => "nsfw_explicit",
            Category::NsfwSuggestive => "nsfw_suggestive",
        }
    }

    /// Parse a provider's category label. Case, `-` and spaces are ignored.
    pub fn from_name(name: &str) -> Option<Category> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_name(c.as_str()), Some(c));
        }
    }

    #[test]
    fn lenient_labels() {
        assert_eq!(Category::from_name("Animal Cruelty"), Some(Category::AnimalCruelty));
        assert_eq!(Category::from_name("NSFW-explicit"), Some(Category::NsfwExplicit));
        assert_eq!(Category::from_name("weather"), None);
    }
}
