//! Generative-AI helpers backed by the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Clone)]
pub struct AiService {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl AiService {
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: &str) -> Self {
        Self {
            client,
            api_base: GEMINI_API_BASE.to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn summarize_log(&self, text: &str) -> Result<String> {
        self.generate(summary_prompt(text), None).await
    }

    pub async fn analyze_risks(&self, context: &str) -> Result<String> {
        self.generate(risk_prompt(context), None).await
    }

    pub async fn extract_materials(&self, csv: &str) -> Result<Vec<Material>> {
        let text = self
            .generate(materials_prompt(csv), Some(materials_schema()))
            .await?;
        parse_materials(&text)
    }

    async fn generate(&self, prompt: String, schema: Option<Value>) -> Result<String> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Unavailable("AI assistant is not configured".to_string())
        })?;

        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if let Some(schema) = schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        tracing::debug!(model = %self.model, "calling generative model");

        let resp = self
            .client
            .post(url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        first_text(resp)
    }
}

fn first_text(resp: GenerateResponse) -> Result<String> {
    resp.candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Upstream("Model returned no text".to_string()))
}

fn summary_prompt(text: &str) -> String {
    format!(
        "You are assisting a construction site manager. Summarize the following \
         daily site log in Brazilian Portuguese, in at most five short bullet points, \
         keeping quantities and dates exact.\n\n{text}"
    )
}

fn risk_prompt(context: &str) -> String {
    format!(
        "You are a construction safety and schedule analyst. Based on the project \
         information below, list the main risks (schedule, safety, weather, supply) \
         with a one-line mitigation for each, in Brazilian Portuguese.\n\n{context}"
    )
}

fn materials_prompt(csv: &str) -> String {
    format!(
        "Extract the list of construction materials from this CSV. Return every \
         material with its name, numeric quantity and unit of measure.\n\n{csv}"
    )
}

fn materials_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "quantity": { "type": "NUMBER" },
                "unit": { "type": "STRING" }
            },
            "required": ["name", "quantity", "unit"]
        }
    })
}

fn parse_materials(text: &str) -> Result<Vec<Material>> {
    let materials: Vec<Material> = serde_json::from_str(text)
        .map_err(|e| AppError::Upstream(format!("Model returned malformed materials: {e}")))?;
    Ok(materials
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  Resumo do dia  "}],"role":"model"}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_text(resp).unwrap(), "Resumo do dia");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(first_text(empty), Err(AppError::Upstream(_))));
    }

    #[test]
    fn parses_structured_materials() {
        let text = r#"[{"name":"Cimento CP-II","quantity":50,"unit":"saco"},{"name":" ","quantity":1,"unit":"un"}]"#;
        let materials = parse_materials(text).unwrap();
        assert_eq!(
            materials,
            vec![Material {
                name: "Cimento CP-II".into(),
                quantity: 50.0,
                unit: "saco".into(),
            }]
        );
        assert!(parse_materials("not json").is_err());
    }

    #[tokio::test]
    async fn unconfigured_service_is_unavailable() {
        let service = AiService::new(reqwest::Client::new(), None, "gemini-1.5-flash");
        assert!(!service.is_configured());
        let err = service.summarize_log("texto").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
