//! Chart rendering — the external pie-chart collaborator.
//!
//! The production implementation posts a Chart.js configuration to a
//! QuickChart-compatible endpoint and gets back a PNG buffer.

use async_trait::async_trait;
use tracing::info;

use crate::analysis::SpendingCategory;
use crate::error::ChartError;

/// Rendered image dimensions.
const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

/// Base palette for chart slices; beyond this, evenly-spaced HSL hues.
const BASE_COLORS: &[&str] = &[
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF",
    "#FF9F40", "#FF6384", "#C9CBCF", "#4BC0C0", "#FF9F40",
];

/// The external chart-rendering collaborator: categorized numeric series in,
/// encoded image buffer out.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render_pie(&self, categories: &[SpendingCategory]) -> Result<Vec<u8>, ChartError>;
}

/// QuickChart-backed pie chart renderer.
pub struct QuickChartRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl QuickChartRenderer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChartRenderer for QuickChartRenderer {
    async fn render_pie(&self, categories: &[SpendingCategory]) -> Result<Vec<u8>, ChartError> {
        if categories.is_empty() {
            return Err(ChartError::EmptySeries);
        }

        info!(slices = categories.len(), "Rendering spending pie chart");
        let body = serde_json::json!({
            "chart": pie_config(categories),
            "width": WIDTH,
            "height": HEIGHT,
            "backgroundColor": "white",
            "format": "png",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChartError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChartError::BadStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChartError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Build the Chart.js pie configuration: one slice per category, legend at
/// the bottom, slice labels annotated with each category's share.
pub fn pie_config(categories: &[SpendingCategory]) -> serde_json::Value {
    let labels: Vec<String> = categories
        .iter()
        .map(|cat| format!("{} ({:.1}%)", cat.category, cat.percentage))
        .collect();
    let data: Vec<f64> = categories.iter().map(|cat| cat.amount).collect();
    let colors = slice_colors(categories.len());

    serde_json::json!({
        "type": "pie",
        "data": {
            "labels": labels,
            "datasets": [{
                "data": data,
                "backgroundColor": colors,
                "borderWidth": 1,
                "borderColor": "#fff",
            }]
        },
        "options": {
            "plugins": {
                "legend": {
                    "position": "bottom",
                    "labels": { "font": { "size": 14 }, "padding": 15 }
                },
                "title": {
                    "display": true,
                    "text": "Spending by Category",
                    "font": { "size": 20, "weight": "bold" },
                    "padding": 20
                }
            }
        }
    })
}

/// Distinct colors for `count` slices.
fn slice_colors(count: usize) -> Vec<String> {
    let mut colors: Vec<String> = BASE_COLORS
        .iter()
        .take(count)
        .map(|c| c.to_string())
        .collect();
    for i in colors.len()..count {
        colors.push(format!("hsl({}, 70%, 60%)", (i * 360) / count));
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn categories(n: usize) -> Vec<SpendingCategory> {
        (0..n)
            .map(|i| SpendingCategory {
                category: format!("Category {i}"),
                amount: 100.0 + i as f64,
                percentage: 100.0 / n as f64,
                transaction_count: i as u32 + 1,
            })
            .collect()
    }

    #[tokio::test]
    async fn render_posts_pie_config_and_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "width": 800,
                "height": 600,
                "backgroundColor": "white",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fake".to_vec()))
            .mount(&server)
            .await;

        let renderer = QuickChartRenderer::new(server.uri());
        let png = renderer.render_pie(&categories(3)).await.unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn render_rejects_empty_series() {
        let renderer = QuickChartRenderer::new("http://localhost:0");
        let err = renderer.render_pie(&[]).await.unwrap_err();
        assert!(matches!(err, ChartError::EmptySeries));
    }

    #[tokio::test]
    async fn render_surfaces_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let renderer = QuickChartRenderer::new(server.uri());
        let err = renderer.render_pie(&categories(1)).await.unwrap_err();
        assert!(matches!(err, ChartError::BadStatus { status: 500 }));
    }

    #[test]
    fn config_has_one_slice_per_category() {
        let config = pie_config(&categories(4));
        assert_eq!(config["type"], "pie");
        assert_eq!(config["data"]["labels"].as_array().unwrap().len(), 4);
        assert_eq!(
            config["data"]["datasets"][0]["data"].as_array().unwrap().len(),
            4
        );
    }

    #[test]
    fn labels_carry_percentages() {
        let config = pie_config(&categories(2));
        let label = config["data"]["labels"][0].as_str().unwrap();
        assert!(label.contains("(50.0%)"));
    }

    #[test]
    fn palette_extends_beyond_base_colors() {
        let colors = slice_colors(13);
        assert_eq!(colors.len(), 13);
        assert_eq!(colors[0], "#FF6384");
        assert!(colors[12].starts_with("hsl("));
    }
}
