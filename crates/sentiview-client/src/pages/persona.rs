//! Persona page.

use sentiview_views::MapContext;
use sentiview_views::filters::DistinctTags;
use sentiview_views::pareto::{BackendPareto, ParetoResponse, map_pareto};
use sentiview_views::wordcloud::{WordCloudData, WordCloudResponse, map_wordcloud};

use super::{FIVE_MINUTES, characteristics, with_optional_tag};
use crate::block::Block;

/// Tag list for the tag pickers.
pub fn distinct_tags() -> Block<DistinctTags, DistinctTags> {
    characteristics::distinct_tags().dedupe(FIVE_MINUTES)
}

/// Word cloud, optionally narrowed to one tag.
pub fn wordcloud(tag: Option<&str>) -> Block<WordCloudResponse, WordCloudData> {
    Block::new(
        "wordcloud",
        with_optional_tag("/unusual_graphics/wordcloud", tag),
        |api: WordCloudResponse, _: &MapContext| map_wordcloud(api),
    )
    .dedupe(FIVE_MINUTES)
}

/// Pareto of negative reviews by tag, optionally narrowed to one tag.
pub fn negative_pareto(tag: Option<&str>) -> Block<BackendPareto, ParetoResponse> {
    Block::new("pareto", with_optional_tag("/unusual_graphics/pareto", tag), map_pareto)
}
