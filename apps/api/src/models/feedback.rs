//! Feedback payload produced by the scoring model, and the schema-validating
//! parse that gates what the pipeline is allowed to persist.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("feedback is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} score {value} is outside [0,100]")]
    ScoreOutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFeedback {
    pub score: f64,
    pub tips: Vec<Tip>,
}

/// The full scoring payload. Category keys are fixed; the scoring prompt
/// demands exactly this shape back from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub overall_score: f64,
    #[serde(rename = "ATS")]
    pub ats: CategoryFeedback,
    pub tone_and_style: CategoryFeedback,
    pub content: CategoryFeedback,
    pub structure: CategoryFeedback,
    pub skills: CategoryFeedback,
}

impl FeedbackPayload {
    /// Parses raw model output into a validated payload.
    ///
    /// Tolerates markdown code fences around the JSON but nothing else:
    /// missing fields, non-numeric scores and out-of-range scores are all
    /// `SchemaError`, and the caller must not persist anything in that case.
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let payload: FeedbackPayload = serde_json::from_str(strip_json_fences(raw))?;
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let scores = [
            ("overallScore", self.overall_score),
            ("ATS", self.ats.score),
            ("toneAndStyle", self.tone_and_style.score),
            ("content", self.content.score),
            ("structure", self.structure.score),
            ("skills", self.skills.score),
        ];
        for (field, value) in scores {
            if !(0.0..=100.0).contains(&value) || value.is_nan() {
                return Err(SchemaError::ScoreOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Presentation tier for a score. The ≥70 boundary is inclusive: 70 is
/// Strong, 69 is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Strong,
    Developing,
    NeedsWork,
}

impl ScoreTier {
    pub fn for_score(score: f64) -> Self {
        if score >= 70.0 {
            ScoreTier::Strong
        } else if score >= 50.0 {
            ScoreTier::Developing
        } else {
            ScoreTier::NeedsWork
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_feedback_json(overall: f64) -> String {
        let category = r#"{"score": 80, "tips": [{"type": "good", "tip": "Clear layout"}]}"#;
        format!(
            r#"{{
                "overallScore": {overall},
                "ATS": {category},
                "toneAndStyle": {category},
                "content": {category},
                "structure": {category},
                "skills": {{"score": 55, "tips": [{{"type": "improve", "tip": "Add metrics", "explanation": "Numbers read better"}}]}}
            }}"#
        )
    }

    #[test]
    fn test_parse_valid_payload() {
        let payload = FeedbackPayload::parse(&valid_feedback_json(82.0)).unwrap();
        assert_eq!(payload.overall_score, 82.0);
        assert_eq!(payload.ats.score, 80.0);
        assert_eq!(payload.skills.tips[0].kind, TipKind::Improve);
        assert_eq!(
            payload.skills.tips[0].explanation.as_deref(),
            Some("Numbers read better")
        );
    }

    #[test]
    fn test_parse_tolerates_code_fences() {
        let fenced = format!("```json\n{}\n```", valid_feedback_json(70.0));
        let payload = FeedbackPayload::parse(&fenced).unwrap();
        assert_eq!(payload.overall_score, 70.0);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = FeedbackPayload::parse("I'm sorry, I can't score this resume.").unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn test_parse_rejects_missing_category() {
        let raw = r#"{"overallScore": 50}"#;
        assert!(FeedbackPayload::parse(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_overall_score() {
        let raw = valid_feedback_json(82.0).replace("82", "\"eighty-two\"");
        assert!(matches!(
            FeedbackPayload::parse(&raw),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_score() {
        let err = FeedbackPayload::parse(&valid_feedback_json(140.0)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ScoreOutOfRange {
                field: "overallScore",
                ..
            }
        ));
    }

    #[test]
    fn test_feedback_round_trips_with_fixed_category_keys() {
        let payload = FeedbackPayload::parse(&valid_feedback_json(64.0)).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("ATS").is_some());
        assert!(json.get("toneAndStyle").is_some());
        assert_eq!(json["skills"]["tips"][0]["type"], "improve");
    }

    #[test]
    fn test_tier_boundary_at_70_is_inclusive() {
        assert_eq!(ScoreTier::for_score(70.0), ScoreTier::Strong);
        assert_eq!(ScoreTier::for_score(69.0), ScoreTier::Developing);
        assert_ne!(ScoreTier::for_score(70.0), ScoreTier::for_score(69.0));
    }

    #[test]
    fn test_tier_lower_boundaries() {
        assert_eq!(ScoreTier::for_score(100.0), ScoreTier::Strong);
        assert_eq!(ScoreTier::for_score(50.0), ScoreTier::Developing);
        assert_eq!(ScoreTier::for_score(49.9), ScoreTier::NeedsWork);
        assert_eq!(ScoreTier::for_score(0.0), ScoreTier::NeedsWork);
    }
}
