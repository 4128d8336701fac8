// ============================================================================
// RANDOM LAYOUT — seeded "surprise me" arrangement
// ============================================================================

use crate::gradient::Rng;
use crate::grid::GridConfig;
use crate::model::{
    BackgroundStyle, Card, CardSize, GradientConfig, GradientMode, TextAlignment,
    TextOrientation, VerticalAlignment, WarpShape,
};
use crate::placement::find_empty_spot;

/// Smaller cards are drawn more often so more of them fit.
const WEIGHTED_SIZES: [CardSize; 9] = [
    CardSize::Square,
    CardSize::Square,
    CardSize::Square,
    CardSize::Square,
    CardSize::Wide,
    CardSize::Wide,
    CardSize::Portrait,
    CardSize::Portrait,
    CardSize::Large,
];

pub const MIN_CARDS: u32 = 8;
pub const MAX_CARDS: u32 = 12;

/// Presentation attributes copied onto a generated card.
#[derive(Clone, Debug, Default)]
pub struct CardStyle {
    pub background_style: Option<BackgroundStyle>,
    pub background_color: Option<&'static str>,
    pub border_color: Option<&'static str>,
    pub border_width: Option<u32>,
    pub text: &'static str,
    pub subtitle: Option<&'static str>,
    pub text_color: Option<&'static str>,
    pub text_alignment: Option<TextAlignment>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub text_orientation: Option<TextOrientation>,
    pub font_size: Option<u32>,
    /// Gradient stops; the rest of the config is drawn per card.
    pub gradient_colors: Option<&'static [&'static str]>,
}

impl CardStyle {
    fn apply(&self, card: &mut Card, rng: &mut Rng) {
        card.background_style = self.background_style;
        card.background_color = self.background_color.map(str::to_string);
        card.border_color = self.border_color.map(str::to_string);
        card.border_width = self.border_width;
        card.text = self.text.to_string();
        card.subtitle = self.subtitle.map(str::to_string);
        card.text_color = self.text_color.map(str::to_string);
        card.text_alignment = self.text_alignment;
        card.vertical_alignment = self.vertical_alignment;
        card.text_orientation = self.text_orientation;
        card.font_size = self.font_size;

        if let Some(colors) = self.gradient_colors {
            let shapes = [
                WarpShape::SimplexNoise,
                WarpShape::FbmNoise,
                WarpShape::Waves,
                WarpShape::DomainWarping,
            ];
            card.gradient = Some(GradientConfig {
                mode: GradientMode::SoftBezier,
                warp_shape: shapes[rng.next_index(shapes.len())],
                warp_strength: 0.3 + rng.next_f64() * 0.5,
                warp_scale: 120.0 + rng.next_f64() * 240.0,
                noise_amount: 0.05,
                seed: rng.next_range(1, 99_999) as i64,
                colors: colors.iter().map(|c| c.to_string()).collect(),
                points: None,
            });
        }

        // Keep text readable on cards without any background.
        if card.background_color.is_none()
            && card.background_image.is_none()
            && card.background_style() != BackgroundStyle::Border
        {
            card.background_color = Some("#f3f4f6".to_string());
        }
        if card.text_color.is_none() {
            card.text_color = Some("#1f2937".to_string());
        }
    }
}

/// Built-in styles drawn by the generator.
pub fn style_catalog() -> Vec<CardStyle> {
    vec![
        CardStyle {
            background_color: Some("#111827"),
            text: "Hello, I'm Alex",
            subtitle: Some("Product designer"),
            text_color: Some("#f9fafb"),
            vertical_alignment: Some(VerticalAlignment::Bottom),
            font_size: Some(28),
            ..CardStyle::default()
        },
        CardStyle {
            background_color: Some("#fef3c7"),
            text: "Currently reading",
            text_color: Some("#92400e"),
            font_size: Some(18),
            ..CardStyle::default()
        },
        CardStyle {
            background_style: Some(BackgroundStyle::Border),
            border_color: Some("#6366f1"),
            border_width: Some(2),
            text: "Projects",
            text_color: Some("#312e81"),
            text_alignment: Some(TextAlignment::Center),
            vertical_alignment: Some(VerticalAlignment::Center),
            ..CardStyle::default()
        },
        CardStyle {
            background_style: Some(BackgroundStyle::Gradient),
            text: "Studio",
            text_color: Some("#ffffff"),
            font_size: Some(24),
            gradient_colors: Some(&["#6366f1", "#ec4899"]),
            ..CardStyle::default()
        },
        CardStyle {
            background_style: Some(BackgroundStyle::Gradient),
            text_color: Some("#ffffff"),
            gradient_colors: Some(&["#0f172a", "#0ea5e9", "#a7f3d0"]),
            ..CardStyle::default()
        },
        CardStyle {
            background_color: Some("#dcfce7"),
            text: "Say hi",
            subtitle: Some("hello@example.com"),
            text_color: Some("#14532d"),
            text_alignment: Some(TextAlignment::Right),
            ..CardStyle::default()
        },
        CardStyle {
            background_style: Some(BackgroundStyle::Border),
            border_color: Some("#111827"),
            border_width: Some(1),
            text: "Now",
            text_orientation: Some(TextOrientation::Vertical),
            ..CardStyle::default()
        },
        CardStyle {
            text: "Notes",
            ..CardStyle::default()
        },
    ]
}

/// Generate a fresh arrangement. The same seed always gives the same cards.
pub fn generate_random_layout(seed: u32, grid: &GridConfig) -> Vec<Card> {
    let mut rng = Rng::new(seed);
    let styles = style_catalog();
    let target = rng.next_range(MIN_CARDS, MAX_CARDS);

    let sizes: Vec<CardSize> = (0..target)
        .map(|_| WEIGHTED_SIZES[rng.next_index(WEIGHTED_SIZES.len())])
        .collect();

    let mut cards: Vec<Card> = Vec::with_capacity(sizes.len());
    for (i, drawn) in sizes.into_iter().enumerate() {
        let placed = find_empty_spot(&cards, drawn, grid, &[])
            .map(|spot| (drawn, spot))
            .or_else(|| {
                CardSize::ALL
                    .iter()
                    .find_map(|&alt| find_empty_spot(&cards, alt, grid, &[]).map(|s| (alt, s)))
            });
        let Some((size, (x, y))) = placed else {
            continue;
        };
        let mut card = Card::new(format!("card-{:x}-{}", seed, i + 1), size, x, y);
        styles[rng.next_index(styles.len())].apply(&mut card, &mut rng);
        cards.push(card);
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GRID_CONFIG;
    use crate::placement::validate_layout;

    #[test]
    fn layouts_are_valid_for_many_seeds() {
        for seed in 0..200 {
            let cards = generate_random_layout(seed, &GRID_CONFIG);
            assert!(validate_layout(&cards, &GRID_CONFIG), "seed {seed}");
            assert!(cards.len() <= MAX_CARDS as usize);
            assert!(!cards.is_empty());
        }
    }

    #[test]
    fn same_seed_same_layout() {
        assert_eq!(
            generate_random_layout(77, &GRID_CONFIG),
            generate_random_layout(77, &GRID_CONFIG)
        );
    }

    #[test]
    fn ids_are_unique() {
        let cards = generate_random_layout(5, &GRID_CONFIG);
        let mut ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), cards.len());
    }

    #[test]
    fn every_card_is_styled() {
        for seed in 0..50 {
            for card in generate_random_layout(seed, &GRID_CONFIG) {
                assert!(card.text_color.is_some());
                if card.background_style() == BackgroundStyle::Gradient {
                    assert!(card.gradient.is_some());
                }
            }
        }
    }

    #[test]
    fn fill_fallback_skips_only_border_styles() {
        let mut rng = Rng::new(3);
        for style in style_catalog() {
            let mut card = Card::new("c", CardSize::Square, 0, 0);
            style.apply(&mut card, &mut rng);
            match (style.background_color, card.background_style()) {
                (Some(color), _) => assert_eq!(card.background_color.as_deref(), Some(color)),
                (None, BackgroundStyle::Border) => assert!(card.background_color.is_none()),
                (None, _) => assert_eq!(card.background_color.as_deref(), Some("#f3f4f6")),
            }
        }
        let gradient = style_catalog()
            .into_iter()
            .find(|s| s.gradient_colors.is_some() && s.background_color.is_none());
        assert!(gradient.is_some());
    }

    #[test]
    fn first_card_takes_origin() {
        let cards = generate_random_layout(1, &GRID_CONFIG);
        assert_eq!((cards[0].x, cards[0].y), (0, 0));
    }
}
