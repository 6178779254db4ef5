use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// Failure to interpret a generation response as the expected structured
/// payload. Surfaced to the caller of the step that issued the prompt; never
/// swallowed here.
#[derive(Debug)]
pub enum ParseError {
    NotJson(serde_json::Error),
    WrongShape(serde_json::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NotJson(err) => write!(f, "Response is not valid JSON: {}", err),
            ParseError::WrongShape(err) => {
                write!(f, "Response JSON does not match the expected shape: {}", err)
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::NotJson(err) | ParseError::WrongShape(err) => Some(err),
        }
    }
}

/// One meal slot of one day in a generated plan.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipePlanItem {
    pub day: String,
    pub meal: MealSlot,
    pub recipe: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientRequirement>,
    #[serde(rename = "cookingTime", alias = "cooking_time_minutes", default)]
    pub cooking_time_minutes: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    #[serde(alias = "Breakfast")]
    Breakfast,
    #[serde(alias = "Lunch")]
    Lunch,
    #[serde(alias = "Dinner")]
    Dinner,
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::Lunch => "Lunch",
            MealSlot::Dinner => "Dinner",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientRequirement {
    pub name: String,
    #[serde(rename = "qty", alias = "quantity")]
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "pcs".to_string()
}

/// Extracts the JSON payload from a raw completion: a ```json fenced block if
/// one is present, a bare fenced block otherwise, else the whole string.
fn json_payload(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let rest = &raw[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    let trimmed = raw.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6 {
        return trimmed
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
    }
    trimmed
}

/// Parses a raw completion into untyped JSON.
pub fn parse_json_response(raw: &str) -> Result<Value, ParseError> {
    serde_json::from_str(json_payload(raw)).map_err(ParseError::NotJson)
}

/// Parses a raw completion into a typed payload, failing closed on any shape
/// mismatch.
pub fn parse_typed<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let value = parse_json_response(raw)?;
    serde_json::from_value(value).map_err(ParseError::WrongShape)
}

/// Parses a raw completion into a recipe plan. Emptiness is the caller's
/// concern; the wrong top-level shape is ours.
pub fn parse_plan(raw: &str) -> Result<Vec<RecipePlanItem>, ParseError> {
    parse_typed(raw)
}
