// src/models/survey.rs

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::User;

/// Represents the 'surveys' table.
///
/// Lifecycle is monotone: draft (`is_public = false`) -> published
/// (`is_public = true`) -> closed (`deleted_at` set, terminal). `total_cost` is
/// fixed at `reward_points * target_respondents` when the draft is created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Survey {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,

    /// Quota: maximum number of submitted responses this survey accepts.
    pub target_respondents: i64,
    /// Points credited to each respondent on submission.
    pub reward_points: i64,
    /// Points debited from the owner at publish time.
    pub total_cost: i64,

    /// Eligibility criteria. 'All' means unconstrained on that axis.
    pub gender: String,
    pub residence: String,
    pub age_min: i64,
    pub age_max: i64,

    /// Absent = never expires.
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,

    pub is_public: bool,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Completed years between `birthdate` and `on`.
pub fn age_on(birthdate: NaiveDate, on: NaiveDate) -> i64 {
    let mut age = i64::from(on.year()) - i64::from(birthdate.year());
    if (on.month(), on.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

/// Pure demographic eligibility check: gender/residence must be 'All' or equal,
/// and the user's age at `today` must fall inside the inclusive range.
///
/// A user without a birthdate never matches: every survey carries an age range,
/// and an unknown age is treated as ineligible rather than an error.
pub fn demographics_match(
    gender: &str,
    residence: &str,
    age_min: i64,
    age_max: i64,
    user: &User,
    today: NaiveDate,
) -> bool {
    if gender != "All" && user.gender.as_deref() != Some(gender) {
        return false;
    }
    if residence != "All" && user.residence.as_deref() != Some(residence) {
        return false;
    }
    match user.birthdate {
        Some(birthdate) => {
            let age = age_on(birthdate, today);
            age >= age_min && age <= age_max
        }
        None => false,
    }
}

impl Survey {
    pub fn matches_demographics(&self, user: &User, today: NaiveDate) -> bool {
        demographics_match(
            &self.gender,
            &self.residence,
            self.age_min,
            self.age_max,
            user,
            today,
        )
    }
}

/// DTO for creating a draft survey.
/// Cross-field criteria checks (age range ordering, non-empty axes) live in
/// `criteria_error` since they span multiple fields.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSurveyRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description too long."))]
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,

    #[validate(range(min = 1, message = "Target respondent count must be positive."))]
    pub target_respondents: i64,
    #[validate(range(min = 0, message = "Reward points cannot be negative."))]
    pub reward_points: i64,

    #[serde(default = "default_all")]
    pub gender: String,
    #[serde(default = "default_all")]
    pub residence: String,
    #[serde(default)]
    pub age_min: i64,
    #[serde(default = "default_age_max")]
    pub age_max: i64,

    pub deadline: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default)]
    pub category_ids: Vec<i64>,
}

fn default_all() -> String {
    "All".to_string()
}

fn default_age_max() -> i64 {
    200
}

impl CreateSurveyRequest {
    /// Returns a description of the first invalid criteria field, if any.
    pub fn criteria_error(&self) -> Option<String> {
        if self.age_min < 0 {
            return Some("age_min cannot be negative".to_string());
        }
        if self.age_max < self.age_min {
            return Some("age_max cannot be below age_min".to_string());
        }
        if self.gender.trim().is_empty() || self.residence.trim().is_empty() {
            return Some("gender and residence criteria cannot be empty".to_string());
        }
        None
    }
}

/// Feed/list projection of a survey, with the live submitted-response count.
#[derive(Debug, Serialize, FromRow)]
pub struct SurveySummary {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub target_respondents: i64,
    pub reward_points: i64,
    pub total_cost: i64,
    pub gender: String,
    pub residence: String,
    pub age_min: i64,
    pub age_max: i64,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
    pub is_public: bool,
    pub submitted_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SurveySummary {
    pub fn matches_demographics(&self, user: &User, today: NaiveDate) -> bool {
        demographics_match(
            &self.gender,
            &self.residence,
            self.age_min,
            self.age_max,
            user,
            today,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(gender: Option<&str>, residence: Option<&str>, birthdate: Option<&str>) -> User {
        User {
            id: 1,
            email: "f@example.com".to_string(),
            password: String::new(),
            name: "F".to_string(),
            gender: gender.map(str::to_string),
            birthdate: birthdate.map(|d| d.parse().unwrap()),
            birthplace: None,
            residence: residence.map(str::to_string),
            phone: None,
            point: 0,
            profile_image: None,
            header_image: None,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    fn survey(gender: &str, residence: &str, age_min: i64, age_max: i64) -> Survey {
        Survey {
            id: 1,
            owner_id: 2,
            title: "X".to_string(),
            description: String::new(),
            image: None,
            target_respondents: 10,
            reward_points: 5,
            total_cost: 50,
            gender: gender.to_string(),
            residence: residence.to_string(),
            age_min,
            age_max,
            deadline: None,
            is_public: true,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn age_counts_completed_years_only() {
        let birthdate: NaiveDate = "2000-06-15".parse().unwrap();
        assert_eq!(age_on(birthdate, "2020-06-14".parse().unwrap()), 19);
        assert_eq!(age_on(birthdate, "2020-06-15".parse().unwrap()), 20);
        assert_eq!(age_on(birthdate, "2020-12-31".parse().unwrap()), 20);
    }

    #[test]
    fn demographic_mismatch_excludes() {
        // Scenario: 20-year-old female from Surabaya vs a Male/Jakarta survey.
        let today: NaiveDate = "2026-01-01".parse().unwrap();
        let u = user(Some("Female"), Some("Surabaya"), Some("2006-01-01"));
        let s = survey("Male", "Jakarta", 17, 40);
        assert!(!s.matches_demographics(&u, today));
    }

    #[test]
    fn all_axes_unconstrained_match() {
        let today: NaiveDate = "2026-01-01".parse().unwrap();
        let u = user(Some("Female"), Some("Surabaya"), Some("2006-01-01"));
        let s = survey("All", "All", 0, 200);
        assert!(s.matches_demographics(&u, today));
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let today: NaiveDate = "2026-01-01".parse().unwrap();
        let u = user(Some("Female"), Some("Surabaya"), Some("2006-01-01"));
        assert!(survey("All", "All", 20, 20).matches_demographics(&u, today));
        assert!(!survey("All", "All", 21, 40).matches_demographics(&u, today));
        assert!(!survey("All", "All", 0, 19).matches_demographics(&u, today));
    }

    #[test]
    fn missing_birthdate_never_matches() {
        let today: NaiveDate = "2026-01-01".parse().unwrap();
        let u = user(Some("Female"), Some("Surabaya"), None);
        assert!(!survey("All", "All", 0, 200).matches_demographics(&u, today));
    }
}
