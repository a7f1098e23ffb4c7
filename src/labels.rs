//! Display labels for the closed enumerations.
//!
//! Every piece of user-facing text for a category, status or priority comes
//! from a [`Labels`] table picked once from the configured locale and handed
//! to the CLI and TUI. Parsing user input goes through the same table, so a
//! label that can be shown can also be typed back.

use serde::{Deserialize, Serialize};

use crate::models::{Category, JourneyStatus, TodoPriority, TodoStatus};
use crate::rollover::OverdueStatus;

/// Category used when user input matches no key or label.
pub const CATEGORY_FALLBACK: Category = Category::Other;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

#[derive(Debug, Clone)]
pub struct Labels {
    categories: [(Category, &'static str); 6],
    journey_statuses: [(JourneyStatus, &'static str); 4],
    todo_statuses: [(TodoStatus, &'static str); 4],
    priorities: [(TodoPriority, &'static str); 4],
    overdue: [(OverdueStatus, &'static str); 3],
}

const EN: Labels = Labels {
    categories: [
        (Category::Work, "Work"),
        (Category::Learning, "Learning"),
        (Category::Health, "Health"),
        (Category::Personal, "Personal"),
        (Category::Relationship, "Relationship"),
        (Category::Other, "Other"),
    ],
    journey_statuses: [
        (JourneyStatus::Planning, "Planning"),
        (JourneyStatus::Active, "Active"),
        (JourneyStatus::Completed, "Completed"),
        (JourneyStatus::Paused, "Paused"),
    ],
    todo_statuses: [
        (TodoStatus::Todo, "To do"),
        (TodoStatus::InProgress, "In progress"),
        (TodoStatus::Completed, "Done"),
        (TodoStatus::Cancelled, "Cancelled"),
    ],
    priorities: [
        (TodoPriority::Low, "Low"),
        (TodoPriority::Normal, "Normal"),
        (TodoPriority::High, "High"),
        (TodoPriority::Urgent, "Urgent"),
    ],
    overdue: [
        (OverdueStatus::Scheduled, "scheduled"),
        (OverdueStatus::Today, "today"),
        (OverdueStatus::Overdue, "overdue"),
    ],
};

const KO: Labels = Labels {
    categories: [
        (Category::Work, "업무"),
        (Category::Learning, "학습"),
        (Category::Health, "건강"),
        (Category::Personal, "개인"),
        (Category::Relationship, "관계"),
        (Category::Other, "기타"),
    ],
    journey_statuses: [
        (JourneyStatus::Planning, "계획중"),
        (JourneyStatus::Active, "진행중"),
        (JourneyStatus::Completed, "완료"),
        (JourneyStatus::Paused, "일시중지"),
    ],
    todo_statuses: [
        (TodoStatus::Todo, "할일"),
        (TodoStatus::InProgress, "진행중"),
        (TodoStatus::Completed, "완료"),
        (TodoStatus::Cancelled, "취소"),
    ],
    priorities: [
        (TodoPriority::Low, "낮음"),
        (TodoPriority::Normal, "보통"),
        (TodoPriority::High, "높음"),
        (TodoPriority::Urgent, "긴급"),
    ],
    overdue: [
        (OverdueStatus::Scheduled, "예정"),
        (OverdueStatus::Today, "오늘"),
        (OverdueStatus::Overdue, "지연"),
    ],
};

fn lookup<T: PartialEq + Copy>(table: &[(T, &'static str)], key: T) -> &'static str {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
        .unwrap_or("?")
}

impl Labels {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::En => EN,
            Locale::Ko => KO,
        }
    }

    pub fn category(&self, category: Category) -> &'static str {
        lookup(&self.categories, category)
    }

    pub fn journey_status(&self, status: JourneyStatus) -> &'static str {
        lookup(&self.journey_statuses, status)
    }

    pub fn todo_status(&self, status: TodoStatus) -> &'static str {
        lookup(&self.todo_statuses, status)
    }

    pub fn priority(&self, priority: TodoPriority) -> &'static str {
        lookup(&self.priorities, priority)
    }

    pub fn overdue(&self, status: OverdueStatus) -> &'static str {
        lookup(&self.overdue, status)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels::for_locale(Locale::default())
    }
}

/// Match a category by storage key or by a display label of any locale.
pub fn try_parse_category(input: &str) -> Option<Category> {
    let needle = input.trim();
    if needle.is_empty() {
        return None;
    }
    if let Ok(category) = needle.parse::<Category>() {
        return Some(category);
    }
    [EN, KO].iter().find_map(|labels| {
        labels
            .categories
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(needle) || *label == needle)
            .map(|(c, _)| *c)
    })
}

/// Total category parser: unknown or empty input falls back to
/// [`CATEGORY_FALLBACK`].
pub fn parse_category(input: &str) -> Category {
    try_parse_category(input).unwrap_or(CATEGORY_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_label_in_every_locale() {
        for locale in [Locale::En, Locale::Ko] {
            let labels = Labels::for_locale(locale);
            for c in Category::ALL {
                assert_ne!(labels.category(c), "?");
            }
            for s in JourneyStatus::ALL {
                assert_ne!(labels.journey_status(s), "?");
            }
            for s in TodoStatus::ALL {
                assert_ne!(labels.todo_status(s), "?");
            }
            for p in TodoPriority::ALL {
                assert_ne!(labels.priority(p), "?");
            }
        }
    }

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!(parse_category("work"), Category::Work);
        assert_eq!(parse_category("HEALTH"), Category::Health);
        assert_eq!(parse_category("Relationship"), Category::Relationship);
        assert_eq!(parse_category("학습"), Category::Learning);
    }

    #[test]
    fn unknown_category_uses_fallback() {
        assert_eq!(try_parse_category("gardening"), None);
        assert_eq!(parse_category("gardening"), CATEGORY_FALLBACK);
        assert_eq!(parse_category("   "), Category::Other);
    }
}
