use std::fmt::Write;

use serde::Serialize;

use crate::detection::Detection;

use super::geometry::{GeometryMapper, ViewRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

const PALETTE: [Color; 10] = [
    Color::rgb(230, 25, 75),
    Color::rgb(60, 180, 75),
    Color::rgb(255, 225, 25),
    Color::rgb(0, 130, 200),
    Color::rgb(245, 130, 48),
    Color::rgb(145, 30, 180),
    Color::rgb(70, 240, 240),
    Color::rgb(240, 50, 230),
    Color::rgb(210, 245, 60),
    Color::rgb(250, 190, 212),
];

/// Stable per-class colour (FNV-1a over the label bytes).
pub fn color_for_label(label: &str) -> Color {
    let hash = label.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, byte| {
        (acc ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotVisibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayBox {
    pub rect: ViewRect,
    pub label: String,
    pub color: Color,
    pub visibility: SlotVisibility,
}

impl DisplayBox {
    fn hidden() -> Self {
        Self {
            rect: ViewRect::default(),
            label: String::new(),
            color: PALETTE[0],
            visibility: SlotVisibility::Hidden,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == SlotVisibility::Visible
    }
}

/// Fixed pool of reusable box slots. The pool is sized once; `show` only
/// rewrites slots in place.
#[derive(Debug, Clone)]
pub struct OverlayState {
    slots: Vec<DisplayBox>,
}

impl OverlayState {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(|_| DisplayBox::hidden()).collect(),
        }
    }

    /// Lay out one inference result. Slot `i` shows detection `i`; extra
    /// detections are dropped and leftover slots hidden.
    pub fn show(&mut self, detections: &[Detection], mapper: &GeometryMapper) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match detections.get(index) {
                Some(detection) => {
                    slot.rect = mapper.to_view(&detection.bbox);
                    slot.label.clear();
                    let _ = write!(
                        slot.label,
                        "{} {:.1}",
                        detection.label,
                        detection.confidence * 100.0
                    );
                    slot.color = color_for_label(&detection.label);
                    slot.visibility = SlotVisibility::Visible;
                }
                None => slot.visibility = SlotVisibility::Hidden,
            }
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.visibility = SlotVisibility::Hidden;
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[DisplayBox] {
        &self.slots
    }

    pub fn visible(&self) -> impl Iterator<Item = &DisplayBox> {
        self.slots.iter().filter(|slot| slot.is_visible())
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::NormalizedRect;
    use crate::overlay::{CaptureAspect, ViewSize};

    fn mapper() -> GeometryMapper {
        GeometryMapper::new(CaptureAspect::default(), ViewSize::new(360.0, 640.0))
    }

    fn detections(n: usize) -> Vec<Detection> {
        (0..n)
            .map(|i| {
                Detection::new(
                    format!("obj{i}"),
                    0.5,
                    NormalizedRect::new(i as f32 * 0.05, 0.1, 0.05, 0.05),
                )
            })
            .collect()
    }

    #[test]
    fn truncates_to_the_first_slot_count_detections() {
        let mut overlay = OverlayState::new(10);
        overlay.show(&detections(15), &mapper());
        assert_eq!(overlay.slot_count(), 10);
        assert_eq!(overlay.visible_count(), 10);
        for (i, slot) in overlay.slots().iter().enumerate() {
            assert!(slot.label.starts_with(&format!("obj{i} ")));
        }
    }

    #[test]
    fn hides_slots_without_a_detection() {
        let mut overlay = OverlayState::new(10);
        overlay.show(&detections(3), &mapper());
        let states: Vec<_> = overlay.slots().iter().map(|s| s.visibility).collect();
        assert_eq!(&states[..3], &[SlotVisibility::Visible; 3]);
        assert_eq!(&states[3..], &[SlotVisibility::Hidden; 7]);
    }

    #[test]
    fn next_cycle_replaces_the_previous_result_entirely() {
        let mut overlay = OverlayState::new(10);
        overlay.show(&detections(8), &mapper());
        let fresh = vec![Detection::new("dog", 0.9, NormalizedRect::FULL)];
        overlay.show(&fresh, &mapper());
        assert_eq!(overlay.visible_count(), 1);
        assert_eq!(overlay.slots()[0].label, "dog 90.0");
        overlay.show(&[], &mapper());
        assert_eq!(overlay.visible_count(), 0);
        assert_eq!(overlay.slot_count(), 10);
    }

    #[test]
    fn label_uses_one_decimal_percentage() {
        let mut overlay = OverlayState::new(2);
        overlay.show(
            &[Detection::new("person", 0.8764, NormalizedRect::FULL)],
            &mapper(),
        );
        assert_eq!(overlay.slots()[0].label, "person 87.6");
    }

    #[test]
    fn slot_rect_comes_from_the_mapper() {
        let mapper = mapper();
        let bbox = NormalizedRect::new(0.2, 0.3, 0.4, 0.2);
        let mut overlay = OverlayState::new(1);
        overlay.show(&[Detection::new("cup", 0.5, bbox)], &mapper);
        assert_eq!(overlay.slots()[0].rect, mapper.to_view(&bbox));
    }

    #[test]
    fn same_label_keeps_its_colour() {
        assert_eq!(color_for_label("person"), color_for_label("person"));
        let mut overlay = OverlayState::new(2);
        overlay.show(
            &[
                Detection::new("person", 0.5, NormalizedRect::FULL),
                Detection::new("person", 0.4, NormalizedRect::FULL),
            ],
            &mapper(),
        );
        assert_eq!(overlay.slots()[0].color, overlay.slots()[1].color);
    }

    #[test]
    fn clear_hides_everything() {
        let mut overlay = OverlayState::default();
        overlay.show(&detections(4), &mapper());
        overlay.clear();
        assert_eq!(overlay.visible_count(), 0);
    }
}
