//! Turns raw catalog payloads into domain records.
//!
//! The catalog encodes "nothing found" several ways: an empty body, a missing or
//! `null` `drinks` field, a string in place of the array (`"no data found"`), or an
//! empty array. All of these parse to an empty result. Only malformed JSON is an
//! error, so callers can tell "no results" apart from a broken upstream.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{ingredient_line, Cocktail, CocktailDetail};

/// Number of numbered ingredient/measure slots in a detail record.
pub const MAX_INGREDIENT_SLOTS: usize = 15;

#[derive(Debug)]
pub enum ParseError {
    Json(serde_json::Error),
    MissingField(&'static str),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Json(e) => write!(f, "malformed catalog payload: {e}"),
            ParseError::MissingField(name) => write!(f, "catalog record without {name}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e)
    }
}

/// Extract the `drinks` array, or `None` for any "no results" encoding.
fn drinks_array(body: &str) -> Result<Option<Vec<Value>>, ParseError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let mut root: Value = serde_json::from_str(body)?;
    let drinks = root.as_object_mut().and_then(|obj| obj.remove("drinks"));
    match drinks {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(Value::String(note)) => {
            debug!(note = %note, "catalog returned a string instead of drinks");
            Ok(None)
        }
        Some(other) => {
            warn!(kind = value_kind(&other), "unexpected drinks value, treating as empty");
            Ok(None)
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Non-blank text of a field. Numbers are accepted for ids; the literal "null" counts as blank.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match obj.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text)
    }
}

/// Parse a `filter.php` search response.
pub fn parse_cocktail_list(body: &str) -> Result<Vec<Cocktail>, ParseError> {
    let Some(items) = drinks_array(body)? else {
        return Ok(Vec::new());
    };
    let cocktails = items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            match (text_field(obj, "idDrink"), text_field(obj, "strDrink")) {
                (Some(id), Some(name)) => Some(Cocktail { id, name }),
                _ => {
                    warn!("skipping drink without id or name");
                    None
                }
            }
        })
        .collect();
    Ok(cocktails)
}

/// Parse a `lookup.php` response. `Ok(None)` means the id is unknown upstream.
/// The image payload is not fetched here; only the thumbnail URL is kept.
pub fn parse_cocktail_details(body: &str) -> Result<Option<CocktailDetail>, ParseError> {
    let Some(items) = drinks_array(body)? else {
        return Ok(None);
    };
    let Some(drink) = items.first().and_then(Value::as_object) else {
        return Ok(None);
    };

    let id = text_field(drink, "idDrink").ok_or(ParseError::MissingField("idDrink"))?;
    let name = text_field(drink, "strDrink").ok_or(ParseError::MissingField("strDrink"))?;

    let mut ingredients = Vec::new();
    for slot in 1..=MAX_INGREDIENT_SLOTS {
        let Some(ingredient) = text_field(drink, &format!("strIngredient{slot}")) else {
            break;
        };
        let measure = text_field(drink, &format!("strMeasure{slot}"));
        ingredients.push(ingredient_line(&ingredient, measure.as_deref()));
    }

    Ok(Some(CocktailDetail {
        id,
        name,
        instructions: text_field(drink, "strInstructions"),
        ingredients,
        thumbnail_url: text_field(drink, "strDrinkThumb"),
        image: None,
    }))
}

/// Parse a `list.php?i=list` response into ingredient names, catalog order.
pub fn parse_ingredients_list(body: &str) -> Result<Vec<String>, ParseError> {
    let Some(items) = drinks_array(body)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| text_field(item.as_object()?, "strIngredient1"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_list_in_catalog_order() {
        let body = json!({"drinks": [
            {"idDrink": "11007", "strDrink": "Margarita", "strDrinkThumb": "x"},
            {"idDrink": "11118", "strDrink": "Blue Margarita"}
        ]})
        .to_string();
        let list = parse_cocktail_list(&body).unwrap();
        assert_eq!(
            list,
            vec![
                Cocktail::new("11007", "Margarita"),
                Cocktail::new("11118", "Blue Margarita")
            ]
        );
    }

    #[test]
    fn empty_result_encodings() {
        for body in [
            "",
            "   ",
            r#"{"drinks":null}"#,
            r#"{"drinks":"no data found"}"#,
            r#"{"drinks":[]}"#,
            r#"{}"#,
        ] {
            assert!(parse_cocktail_list(body).unwrap().is_empty(), "body {body:?}");
            assert!(parse_cocktail_details(body).unwrap().is_none(), "body {body:?}");
            assert!(parse_ingredients_list(body).unwrap().is_empty(), "body {body:?}");
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_cocktail_list("<html>"), Err(ParseError::Json(_))));
        assert!(parse_cocktail_details("{\"drinks\": [").is_err());
    }

    #[test]
    fn detail_scan_stops_at_first_blank_slot() {
        let body = json!({"drinks": [{
            "idDrink": "1",
            "strDrink": "Screwdriver",
            "strInstructions": "Mix.",
            "strDrinkThumb": "https://img/screwdriver.jpg",
            "strIngredient1": "Vodka",
            "strMeasure1": "50 ml",
            "strIngredient2": "",
            "strMeasure2": "",
            "strIngredient3": "Orange juice",
            "strMeasure3": "100 ml"
        }]})
        .to_string();
        let detail = parse_cocktail_details(&body).unwrap().unwrap();
        assert_eq!(detail.ingredients, vec!["Vodka - 50 ml".to_string()]);
        assert_eq!(detail.instructions.as_deref(), Some("Mix."));
        assert_eq!(
            detail.thumbnail_url.as_deref(),
            Some("https://img/screwdriver.jpg")
        );
        assert_eq!(detail.image, None);
    }

    #[test]
    fn detail_measures_are_optional_and_null_is_blank() {
        let body = json!({"drinks": [{
            "idDrink": 17222,
            "strDrink": "A1",
            "strInstructions": null,
            "strIngredient1": "Gin",
            "strMeasure1": "1 3/4 shot ",
            "strIngredient2": "Ice",
            "strMeasure2": null,
            "strIngredient3": "null",
            "strMeasure3": "1 oz"
        }]})
        .to_string();
        let detail = parse_cocktail_details(&body).unwrap().unwrap();
        assert_eq!(detail.id, "17222");
        assert_eq!(detail.instructions, None);
        assert_eq!(
            detail.ingredients,
            vec!["Gin - 1 3/4 shot".to_string(), "Ice".to_string()]
        );
    }

    #[test]
    fn detail_scan_covers_all_fifteen_slots() {
        let mut drink = serde_json::Map::new();
        drink.insert("idDrink".into(), json!("9"));
        drink.insert("strDrink".into(), json!("Everything"));
        for slot in 1..=16 {
            drink.insert(format!("strIngredient{slot}"), json!(format!("I{slot}")));
        }
        let body = json!({ "drinks": [Value::Object(drink)] }).to_string();
        let detail = parse_cocktail_details(&body).unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), MAX_INGREDIENT_SLOTS);
        assert_eq!(detail.ingredients.last().map(String::as_str), Some("I15"));
    }

    #[test]
    fn detail_without_id_is_an_error() {
        let body = json!({"drinks": [{"strDrink": "Nameless"}]}).to_string();
        assert!(matches!(
            parse_cocktail_details(&body),
            Err(ParseError::MissingField("idDrink"))
        ));
    }

    #[test]
    fn ingredient_names() {
        let body = json!({"drinks": [
            {"strIngredient1": "Light rum"},
            {"strIngredient1": "Applejack"},
            {"other": 1}
        ]})
        .to_string();
        assert_eq!(
            parse_ingredients_list(&body).unwrap(),
            vec!["Light rum".to_string(), "Applejack".to_string()]
        );
    }
}
