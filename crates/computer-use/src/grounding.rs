//! Natural-language-to-pixel resolution.
//!
//! A grounding model is shown a screenshot and a description of an element
//! and answers with a point or a bounding box, usually wrapped in
//! `<|box_start|>`/`<|box_end|>` markers. [`extract_bbox_midpoint`] reduces
//! that answer to a single [`Coordinate`].
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;
use crate::prompt_template::grounding_prompt;
use crate::providers::base::Provider;

lazy_static! {
    static ref BOX_MARKERS: Regex = Regex::new(r"<\|box_start\|>(.*?)<\|box_end\|>").unwrap();
    static ref NUMBER: Regex = Regex::new(r"\d+\.\d+|\d+").unwrap();
}

/// A pixel position on the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
}

/// The space a grounding model answers in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Screenshot pixels
    #[default]
    Absolute,
    /// 0..1000 on both axes, independent of the screenshot size
    Normalized1000,
}

impl Coordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Map a coordinate from `space` onto a screen of `width` x `height` pixels.
    /// Normalized answers outside 0..1000 are clamped to the screen edge.
    pub fn rescale(self, space: CoordinateSpace, width: u32, height: u32) -> Self {
        match space {
            CoordinateSpace::Absolute => self,
            CoordinateSpace::Normalized1000 => Self {
                x: scale_axis(self.x, width),
                y: scale_axis(self.y, height),
            },
        }
    }
}

fn scale_axis(value: i64, extent: u32) -> i64 {
    let last = f64::from(extent.saturating_sub(1));
    (value as f64 * f64::from(extent) / 1000.0)
        .floor()
        .clamp(0.0, last) as i64
}

/// Reduce a grounding answer to one coordinate.
///
/// Numbers are read from between the box markers, or from the whole answer
/// when the markers are missing. Two numbers are a point; four or more are
/// `x1, y1, x2, y2` and give the floored midpoint. Any other count yields
/// `None`.
pub fn extract_bbox_midpoint(response: &str) -> Option<Coordinate> {
    let inner = BOX_MARKERS
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map_or(response, |inner| inner.as_str());

    let numbers: Vec<f64> = NUMBER
        .find_iter(inner)
        .filter_map(|number| number.as_str().parse().ok())
        .collect();

    match numbers.as_slice() {
        [x, y] => Some(Coordinate::new(x.floor() as i64, y.floor() as i64)),
        [x1, y1, x2, y2, ..] => Some(Coordinate::new(
            ((x1 + x2) / 2.0).floor() as i64,
            ((y1 + y2) / 2.0).floor() as i64,
        )),
        _ => None,
    }
}

/// Locates described elements on a screenshot with a vision model
pub struct GroundingResolver {
    provider: Box<dyn Provider>,
    space: CoordinateSpace,
}

impl GroundingResolver {
    pub fn new(provider: Box<dyn Provider>, space: CoordinateSpace) -> Self {
        Self { provider, space }
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    /// Ask the grounding model where `query` is. The coordinate is in the
    /// resolver's [`CoordinateSpace`]; `None` when the answer has no usable
    /// numbers.
    pub async fn locate(&self, screenshot: &[u8], query: &str) -> ProviderResult<Option<Coordinate>> {
        let prompt = grounding_prompt(query)
            .map_err(|e| ProviderError::Config(format!("Failed to render grounding prompt: {}", e)))?;
        let messages = vec![Message::user()
            .with_image(screenshot.to_vec())
            .with_text(prompt)];

        let answer = self.provider.call(&messages).await?;
        tracing::debug!(query = %query, answer = %answer, "Grounding answer");

        let coordinate = extract_bbox_midpoint(&answer);
        if coordinate.is_none() {
            tracing::warn!(query = %query, answer = %answer, "Grounding answer has no usable coordinate");
        }
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::{MessageContent, Role};
    use crate::providers::mock::{MockProvider, MockResponse};

    #[test]
    fn test_bounding_box_midpoint() {
        assert_eq!(
            extract_bbox_midpoint("<|box_start|>10,10,20,20<|box_end|>"),
            Some(Coordinate::new(15, 15))
        );
        assert_eq!(
            extract_bbox_midpoint("<|box_start|>(11,10),(20,21)<|box_end|>"),
            Some(Coordinate::new(15, 15))
        );
    }

    #[test]
    fn test_point_without_markers() {
        assert_eq!(extract_bbox_midpoint("(5,7)"), Some(Coordinate::new(5, 7)));
    }

    #[test]
    fn test_unusable_counts() {
        assert_eq!(extract_bbox_midpoint("nothing numeric"), None);
        assert_eq!(extract_bbox_midpoint("only 42"), None);
        assert_eq!(extract_bbox_midpoint("<|box_start|>1,2,3<|box_end|>"), None);
    }

    #[test]
    fn test_decimals_and_extra_numbers() {
        assert_eq!(
            extract_bbox_midpoint("<|box_start|>(10.5,20.5),(11.0,21.9)<|box_end|>"),
            Some(Coordinate::new(10, 21))
        );
        assert_eq!(
            extract_bbox_midpoint("box 100 200 300 400 confidence 98"),
            Some(Coordinate::new(200, 300))
        );
    }

    #[test]
    fn test_markers_take_priority_over_surrounding_text() {
        assert_eq!(
            extract_bbox_midpoint("element 3 of 9: <|box_start|>(0,0),(10,10)<|box_end|>"),
            Some(Coordinate::new(5, 5))
        );
    }

    #[test]
    fn test_rescale() {
        let point = Coordinate::new(500, 250);
        assert_eq!(point.rescale(CoordinateSpace::Absolute, 1920, 1080), point);
        assert_eq!(
            point.rescale(CoordinateSpace::Normalized1000, 1920, 1080),
            Coordinate::new(960, 270)
        );
        assert_eq!(
            Coordinate::new(999, 999).rescale(CoordinateSpace::Normalized1000, 1024, 768),
            Coordinate::new(1022, 767)
        );
    }

    #[test]
    fn test_rescale_clamps_oversized_answers() {
        let huge = extract_bbox_midpoint("(1000000000000000000,5)").unwrap();
        assert_eq!(
            huge.rescale(CoordinateSpace::Normalized1000, 1920, 1080),
            Coordinate::new(1919, 5)
        );
        assert_eq!(
            Coordinate::new(i64::MAX, 1000).rescale(CoordinateSpace::Normalized1000, 64, 48),
            Coordinate::new(63, 47)
        );
        assert_eq!(
            Coordinate::new(10, 10).rescale(CoordinateSpace::Normalized1000, 0, 0),
            Coordinate::new(0, 0)
        );
    }

    #[tokio::test]
    async fn test_locate_sends_image_then_prompt() -> ProviderResult<()> {
        let provider = MockProvider::new(vec![MockResponse::Text(
            "<|box_start|>(100,200),(300,400)<|box_end|>".to_string(),
        )]);
        let resolver = GroundingResolver::new(Box::new(provider.clone()), CoordinateSpace::Absolute);

        let coordinate = resolver.locate(b"fake-png", "Firefox icon").await?;
        assert_eq!(coordinate, Some(Coordinate::new(200, 300)));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let message = &requests[0][0];
        assert_eq!(message.role(), Role::User);
        assert!(matches!(message.content[0], MessageContent::Image(_)));
        assert!(message.text().ends_with("Description: Firefox icon"));
        Ok(())
    }

    #[tokio::test]
    async fn test_locate_without_numbers() -> ProviderResult<()> {
        let provider = MockProvider::new(vec![MockResponse::Text("I cannot find it.".to_string())]);
        let resolver = GroundingResolver::new(Box::new(provider), CoordinateSpace::Normalized1000);

        assert_eq!(resolver.locate(b"fake-png", "Trash").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_locate_propagates_provider_errors() {
        let provider = MockProvider::new(vec![MockResponse::Error("overloaded".to_string())]);
        let resolver = GroundingResolver::new(Box::new(provider), CoordinateSpace::Absolute);

        let result = resolver.locate(b"fake-png", "Trash").await;
        assert!(matches!(result, Err(ProviderError::Api(_))));
    }
}
