use eframe::egui::{self, Color32, CornerRadius, FontId, Stroke, TextStyle};

use crate::host::ThemeColors;

/// Swatches for absent or unparseable theme keys fall back to black.
pub const FALLBACK_SWATCH: Color32 = Color32::BLACK;
pub const FALLBACK_SWATCH_HEX: &str = "#000000";

pub fn parse_hex(value: &str) -> Option<Color32> {
    let raw = value.strip_prefix('#')?;
    if raw.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&raw[0..2], 16).ok()?;
    let g = u8::from_str_radix(&raw[2..4], 16).ok()?;
    let b = u8::from_str_radix(&raw[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

pub fn swatch_color(theme: Option<&ThemeColors>, key: &str) -> Color32 {
    theme
        .and_then(|theme| theme.get(key))
        .and_then(parse_hex)
        .unwrap_or(FALLBACK_SWATCH)
}

fn lift(color: Color32, amount: u8) -> Color32 {
    Color32::from_rgb(
        color.r().saturating_add(amount),
        color.g().saturating_add(amount),
        color.b().saturating_add(amount),
    )
}

/// UI palette derived from the host theme mapping, with the demo palette
/// as the fallback for any key that is absent or unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub background: Color32,
    pub surface: Color32,
    pub text: Color32,
    pub hint: Color32,
    pub accent: Color32,
    pub accent_text: Color32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(0x18, 0x22, 0x2d),
            surface: Color32::from_rgb(0x22, 0x2c, 0x37),
            text: Color32::from_rgb(0xff, 0xff, 0xff),
            hint: Color32::from_rgb(0x99, 0x99, 0x99),
            accent: Color32::from_rgb(0x87, 0x74, 0xe1),
            accent_text: Color32::from_rgb(0xff, 0xff, 0xff),
        }
    }
}

impl Palette {
    pub fn from_theme(theme: Option<&ThemeColors>) -> Self {
        let base = Self::default();
        let Some(theme) = theme else { return base };

        let pick = |value: Option<&str>, fallback: Color32| {
            value.and_then(parse_hex).unwrap_or(fallback)
        };

        let background = pick(theme.bg_color.as_deref(), base.background);
        Self {
            background,
            surface: lift(background, 10),
            text: pick(theme.text_color.as_deref(), base.text),
            hint: pick(theme.hint_color.as_deref(), base.hint),
            accent: pick(theme.button_color.as_deref(), base.accent),
            accent_text: pick(theme.button_text_color.as_deref(), base.accent_text),
        }
    }

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.background;
        visuals.window_fill = self.surface;
        visuals.override_text_color = Some(self.text);
        visuals.widgets.noninteractive.bg_fill = self.surface;
        visuals.widgets.noninteractive.weak_bg_fill = self.surface;
        visuals.widgets.noninteractive.fg_stroke.color = self.text;
        visuals.widgets.inactive.bg_fill = self.surface;
        visuals.widgets.inactive.weak_bg_fill = self.surface;
        visuals.widgets.inactive.fg_stroke.color = self.text;
        visuals.widgets.hovered.bg_fill = lift(self.surface, 12);
        visuals.widgets.hovered.fg_stroke.color = self.text;
        visuals.widgets.active.bg_fill = self.accent;
        visuals.widgets.active.fg_stroke.color = self.accent_text;
        visuals.selection.bg_fill = self.accent;
        visuals.hyperlink_color = self.accent;
        visuals.window_stroke = Stroke::NONE;
        visuals.window_corner_radius = CornerRadius::same(10);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(17.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }
}
