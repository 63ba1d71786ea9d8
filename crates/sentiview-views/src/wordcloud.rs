//! Word clouds.

use serde::{Deserialize, Serialize};

/// Raw word cloud payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloudResponse {
    /// Chart id.
    #[serde(default)]
    pub id: Option<String>,
    /// Words.
    #[serde(default)]
    pub words: Vec<BackendWord>,
}

/// Raw word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendWord {
    /// The word.
    pub word: String,
    /// Occurrences.
    pub mentions: f64,
    /// Average rating of reviews containing the word.
    pub avg_rating: f64,
    /// Colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Rendered word.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordItem {
    /// The word.
    pub text: String,
    /// Weight.
    pub value: f64,
    /// Colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Occurrences.
    pub mentions: f64,
    /// Average rating.
    pub avg_rating: f64,
}

/// Chart-ready word cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloudData {
    /// Chart id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Words weighted by mentions.
    pub items: Vec<WordItem>,
}

/// Maps words to items weighted by mentions.
pub fn map_wordcloud(api: WordCloudResponse) -> WordCloudData {
    let items = api
        .words
        .into_iter()
        .map(|w| WordItem {
            text: w.word,
            value: w.mentions,
            color: w.color,
            mentions: w.mentions,
            avg_rating: w.avg_rating,
        })
        .collect();
    WordCloudData { id: api.id, items }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_words_weighted_by_mentions() {
        let api: WordCloudResponse = serde_json::from_value(json!({
            "id": "wc",
            "words": [
                { "word": "кэшбэк", "mentions": 12, "avg_rating": 2.5, "color": "#f00" },
                { "word": "приложение", "mentions": 3, "avg_rating": 4.0 }
            ]
        }))
        .unwrap();
        let cloud = map_wordcloud(api);
        assert_eq!(cloud.id.as_deref(), Some("wc"));
        assert_eq!(cloud.items[0].value, 12.0);
        assert_eq!(cloud.items[0].color.as_deref(), Some("#f00"));
        assert_eq!(cloud.items[1].avg_rating, 4.0);
        assert!(cloud.items[1].color.is_none());

        let rendered = serde_json::to_value(&cloud.items[1]).unwrap();
        assert_eq!(rendered["avgRating"], json!(4.0));
    }

    #[test]
    fn test_missing_words() {
        let cloud = map_wordcloud(serde_json::from_value(json!({ "id": "wc" })).unwrap());
        assert!(cloud.items.is_empty());
    }
}
