//! Heuristic analyzers: trend insights over collected data and structural
//! summaries of individual models.

use std::collections::BTreeMap;

use aiinsight_core::{AnalysisResult, Analyzer};
use aiinsight_shared::{
    AiInsightError, AppConfig, CollectedData, Insight, InsightReport, Item, ModelAnalysis,
    ModelDescriptor, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Trend insights
// ---------------------------------------------------------------------------

/// Deterministic top-N insights over a whole collection.
#[derive(Debug, Clone)]
pub struct TrendInsightAnalyzer {
    top_n: usize,
    include_languages: bool,
}

impl TrendInsightAnalyzer {
    pub fn new(top_n: usize, include_languages: bool) -> Self {
        Self {
            top_n: top_n.max(1),
            include_languages,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.analyzer.insight_top_n,
            config.analyzer.enable_code_analysis,
        )
    }

    fn ranked(&self, category: &str, title: &str, values: Vec<&str>) -> Option<Insight> {
        let top = top_counts(values, self.top_n);
        if top.is_empty() {
            return None;
        }
        let detail = top
            .iter()
            .map(|(value, count)| format!("{value} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        Some(Insight {
            category: category.into(),
            title: title.into(),
            detail,
        })
    }
}

#[async_trait]
impl Analyzer for TrendInsightAnalyzer {
    type Input = CollectedData;
    type Output = InsightReport;

    fn name(&self) -> &str {
        "insight_analyzer"
    }

    async fn analyze(&self, input: &CollectedData) -> Result<AnalysisResult<InsightReport>> {
        if input.is_empty() {
            return Err(AiInsightError::validation("no collected items to analyze"));
        }

        let items: Vec<&Item> = input.iter().flat_map(|(_, items)| items.iter()).collect();
        let mut insights = vec![Insight {
            category: "overview".into(),
            title: format!(
                "Collected {} items from {} sources",
                input.total_items(),
                input.iter().filter(|(_, items)| !items.is_empty()).count()
            ),
            detail: input
                .counts()
                .iter()
                .map(|(slot, n)| format!("{slot}: {n}"))
                .collect::<Vec<_>>()
                .join(", "),
        }];

        let providers = items
            .iter()
            .filter_map(|item| match item {
                Item::AiModel(m) => Some(m.provider.as_str()),
                _ => None,
            })
            .collect();
        insights.extend(self.ranked("models", "Most active model providers", providers));

        let mut repos: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                Item::Repository(r) => Some(r),
                _ => None,
            })
            .collect();
        repos.sort_by(|a, b| b.stars.cmp(&a.stars).then_with(|| a.full_name.cmp(&b.full_name)));
        if !repos.is_empty() {
            insights.push(Insight {
                category: "repos".into(),
                title: "Most starred repositories".into(),
                detail: repos
                    .iter()
                    .take(self.top_n)
                    .map(|r| format!("{} ({} stars)", r.full_name, r.stars))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        if self.include_languages {
            let languages = repos.iter().filter_map(|r| r.language.as_deref()).collect();
            insights.extend(self.ranked("repos", "Dominant languages", languages));
        }

        let tasks = items
            .iter()
            .filter_map(|item| item.as_hub_model().and_then(|m| m.pipeline_tag.as_deref()))
            .collect();
        insights.extend(self.ranked("hf_models", "Dominant model tasks", tasks));

        let categories = items
            .iter()
            .filter_map(|item| match item {
                Item::Paper(p) => Some(p.categories.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect();
        insights.extend(self.ranked("papers", "Most active research areas", categories));

        debug!(insights = insights.len(), "trend insights computed");

        Ok(AnalysisResult::success(InsightReport {
            generated_at: Utc::now(),
            insights,
            totals: input.counts(),
        })
        .with_metadata("top_n", self.top_n))
    }
}

/// Most frequent values, ties broken alphabetically.
fn top_counts(values: Vec<&str>, n: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Model structure
// ---------------------------------------------------------------------------

/// Derives architecture family and parameter scale from model metadata.
#[derive(Debug, Clone, Default)]
pub struct ModelStructureAnalyzer;

#[async_trait]
impl Analyzer for ModelStructureAnalyzer {
    type Input = ModelDescriptor;
    type Output = ModelAnalysis;

    fn name(&self) -> &str {
        "model_analyzer"
    }

    async fn analyze(&self, input: &ModelDescriptor) -> Result<AnalysisResult<ModelAnalysis>> {
        if input.name.trim().is_empty() {
            return Err(AiInsightError::validation("model descriptor has no name"));
        }

        let mut errors = Vec::new();
        if input.model_type.is_none() {
            errors.push(format!("missing model type for {}", input.name));
        }

        let architecture = architecture_family(input);
        let parameter_scale_b = input
            .config
            .get("num_parameters")
            .and_then(serde_json::Value::as_f64)
            .map(|n| n / 1e9)
            .or_else(|| parameter_scale(&input.name));

        let mut highlights = vec![format!("architecture: {architecture}")];
        if let Some(scale) = parameter_scale_b {
            highlights.push(format!("~{}B parameters", format_scale(scale)));
        }
        if let Some(task) = &input.model_type {
            highlights.push(format!("task: {task}"));
        }

        Ok(AnalysisResult::from_outcome(
            ModelAnalysis {
                model_name: input.name.clone(),
                provider: input.provider.clone(),
                model_type: input.model_type.clone(),
                architecture,
                parameter_scale_b,
                highlights,
            },
            errors,
        ))
    }
}

fn architecture_family(input: &ModelDescriptor) -> String {
    if let Some(arch) = input
        .config
        .get("architectures")
        .and_then(|v| v.get(0))
        .and_then(serde_json::Value::as_str)
    {
        return arch.to_string();
    }

    let name = input.name.to_lowercase();
    let by_name = [
        (&["bert", "roberta", "electra"][..], "encoder-only transformer"),
        (&["t5", "bart", "whisper"][..], "encoder-decoder transformer"),
        (&["vit", "clip", "dino"][..], "vision transformer"),
        (&["diffusion", "sdxl"][..], "latent diffusion"),
        (
            &["llama", "gpt", "mistral", "mixtral", "qwen", "phi", "gemma", "falcon"][..],
            "decoder-only transformer",
        ),
    ];
    for (needles, family) in by_name {
        if needles.iter().any(|n| name.contains(n)) {
            return family.to_string();
        }
    }

    let family = match input.model_type.as_deref() {
        Some("text-generation") => "decoder-only transformer",
        Some("fill-mask" | "token-classification") => "encoder-only transformer",
        Some("text2text-generation" | "translation" | "summarization") => {
            "encoder-decoder transformer"
        }
        Some("image-classification") => "vision transformer",
        Some("text-to-image") => "latent diffusion",
        _ => "unknown",
    };
    family.to_string()
}

/// Parameter count in billions from tokens like `7b`, `1.5B`, `70M`, `8x7b`.
fn parameter_scale(name: &str) -> Option<f64> {
    name.split(|c: char| matches!(c, '-' | '_' | '/' | ' ' | ':'))
        .find_map(parse_scale_token)
}

fn parse_scale_token(token: &str) -> Option<f64> {
    let token = token.to_ascii_lowercase();
    let (number, divisor) = if let Some(n) = token.strip_suffix('b') {
        (n, 1.0)
    } else if let Some(n) = token.strip_suffix('m') {
        (n, 1000.0)
    } else {
        return None;
    };

    let mut product = 1.0;
    for factor in number.split('x') {
        let value: f64 = factor.parse().ok()?;
        product *= value;
    }
    (product > 0.0).then_some(product / divisor)
}

fn format_scale(scale: f64) -> String {
    let text = format!("{scale:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiinsight_core::UnitStatus;
    use aiinsight_shared::{AiModel, HubModel, Paper, Repository};

    fn sample_data() -> CollectedData {
        let mut data = CollectedData::with_slots(["models", "repos", "hf_models", "papers"]);
        data.set_slot(
            "models",
            ["openai", "anthropic", "openai"]
                .iter()
                .enumerate()
                .map(|(i, provider)| {
                    Item::AiModel(AiModel {
                        name: format!("model-{i}"),
                        provider: provider.to_string(),
                        release_date: None,
                        description: None,
                        url: None,
                    })
                })
                .collect(),
        );
        data.set_slot(
            "repos",
            [("a/low", 10, "Rust"), ("b/high", 900, "Python"), ("c/mid", 50, "Python")]
                .into_iter()
                .map(|(name, stars, lang)| {
                    Item::Repository(Repository {
                        full_name: name.into(),
                        description: None,
                        stars,
                        language: Some(lang.into()),
                        url: None,
                    })
                })
                .collect(),
        );
        data.set_slot(
            "hf_models",
            vec![Item::HubModel(HubModel {
                model_id: "acme/tiny-7b".into(),
                author: None,
                pipeline_tag: Some("text-generation".into()),
                downloads: 5,
                likes: 1,
                tags: vec![],
            })],
        );
        data.set_slot(
            "papers",
            vec![Item::Paper(Paper {
                arxiv_id: "2401.1".into(),
                title: "Agents".into(),
                authors: vec![],
                categories: vec!["cs.AI".into(), "cs.CL".into()],
                summary: None,
                published: None,
            })],
        );
        data
    }

    fn descriptor(name: &str, model_type: Option<&str>) -> ModelDescriptor {
        ModelDescriptor {
            name: name.into(),
            provider: Some("acme".into()),
            model_type: model_type.map(String::from),
            config: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn trend_insights_are_ranked() {
        let analyzer = TrendInsightAnalyzer::new(2, true);
        let result = analyzer.analyze(&sample_data()).await.unwrap();
        let report = result.payload.unwrap();

        let find = |title: &str| {
            report
                .insights
                .iter()
                .find(|i| i.title == title)
                .map(|i| i.detail.clone())
        };
        assert_eq!(
            find("Most active model providers").as_deref(),
            Some("openai (2), anthropic (1)")
        );
        assert_eq!(
            find("Most starred repositories").as_deref(),
            Some("b/high (900 stars), c/mid (50 stars)")
        );
        assert_eq!(find("Dominant languages").as_deref(), Some("Python (2), Rust (1)"));
        assert_eq!(find("Most active research areas").as_deref(), Some("cs.AI (1), cs.CL (1)"));
        assert_eq!(report.totals["repos"], 3);
        assert_eq!(report.insights[0].title, "Collected 8 items from 4 sources");
    }

    #[tokio::test]
    async fn languages_can_be_disabled() {
        let analyzer = TrendInsightAnalyzer::new(3, false);
        let report = analyzer.analyze(&sample_data()).await.unwrap().payload.unwrap();
        assert!(report.insights.iter().all(|i| i.title != "Dominant languages"));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let analyzer = TrendInsightAnalyzer::new(3, true);
        let err = analyzer
            .analyze(&CollectedData::with_slots(["models"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no collected items"));
    }

    #[tokio::test]
    async fn model_structure_from_name() {
        let result = ModelStructureAnalyzer
            .analyze(&descriptor("meta-llama/Llama-3.1-8B", Some("text-generation")))
            .await
            .unwrap();
        assert_eq!(result.status, UnitStatus::Success);
        let analysis = result.payload.unwrap();
        assert_eq!(analysis.architecture, "decoder-only transformer");
        assert_eq!(analysis.parameter_scale_b, Some(8.0));
        assert!(analysis.highlights.contains(&"~8B parameters".to_string()));
    }

    #[tokio::test]
    async fn missing_model_type_is_partial() {
        let result = ModelStructureAnalyzer
            .analyze(&descriptor("acme/bert-base-110m", None))
            .await
            .unwrap();
        assert_eq!(result.status, UnitStatus::Partial);
        assert_eq!(result.errors, vec!["missing model type for acme/bert-base-110m".to_string()]);
        let analysis = result.payload.unwrap();
        assert_eq!(analysis.architecture, "encoder-only transformer");
        assert_eq!(analysis.parameter_scale_b, Some(0.11));
    }

    #[test]
    fn scale_tokens() {
        assert_eq!(parameter_scale("qwen2-1.5B-instruct"), Some(1.5));
        assert_eq!(parameter_scale("mistralai/Mixtral-8x7B-v0.1"), Some(56.0));
        assert_eq!(parameter_scale("EleutherAI/pythia-70m"), Some(0.07));
        assert_eq!(parameter_scale("openai/whisper-large"), None);
        assert_eq!(format_scale(0.07), "0.07");
        assert_eq!(format_scale(56.0), "56");
    }

    #[test]
    fn config_architectures_take_precedence() {
        let mut desc = descriptor("acme/custom", Some("text-generation"));
        desc.config.insert(
            "architectures".into(),
            serde_json::json!(["MambaForCausalLM"]),
        );
        assert_eq!(architecture_family(&desc), "MambaForCausalLM");
    }
}
