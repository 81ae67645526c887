use serde::{Deserialize, Serialize};

use crate::{impl_pg_text_for_enum, impl_str_enum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Puzzle,
    Riddle,
    Logic,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Progress,
    Streak,
    Category,
}

impl_str_enum!(Category {
    Puzzle => "puzzle",
    Riddle => "riddle",
    Logic => "logic",
    Memory => "memory",
});
impl_str_enum!(Difficulty {
    Easy => "Easy",
    Medium => "Medium",
    Hard => "Hard",
});
impl_str_enum!(AchievementCategory {
    Progress => "progress",
    Streak => "streak",
    Category => "category",
});

impl_pg_text_for_enum!(Category);
impl_pg_text_for_enum!(Difficulty);
impl_pg_text_for_enum!(AchievementCategory);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("LOGIC".parse::<Category>().unwrap(), Category::Logic);
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("trivia".parse::<Category>().is_err());
    }

    #[test]
    fn displays_column_text() {
        assert_eq!(Category::Memory.to_string(), "memory");
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
        assert_eq!(AchievementCategory::Streak.to_string(), "streak");
        assert_eq!(Category::ALL.len(), 4);
    }
}
