use serde::de::DeserializeOwned;
use dg_core::{Error, Result};

/// The outermost `{...}` in a model reply. Models like to wrap JSON in prose or code fences.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let object = extract_json_object(raw)
        .ok_or_else(|| Error::Inference(format!("Model reply contained no JSON object: {:.80}", raw)))?;
    Ok(serde_json::from_str(object)?)
}
