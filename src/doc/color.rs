//! Stroke colors. Like pen ids, the table has deliberate holes and unrecognised ids still need to
//! render as something — they fall back to black.

/// An RGB triple in the 0-255 range, as consumed by [`crate::render::Canvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rgb(pub(crate) u8, pub(crate) u8, pub(crate) u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Known(KnownColor),
    Unknown(u32),
}

impl Color {
    pub(crate) fn new(id: u32) -> Self {
        match KnownColor::from_id(id) {
            Some(color) => Self::Known(color),
            None => Self::Unknown(id),
        }
    }

    pub(crate) fn rgb(&self) -> Rgb {
        match self {
            Self::Known(color) => color.rgb(),
            Self::Unknown(_) => KnownColor::Black.rgb(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownColor {
    Black,
    Gray,
    White,
    Yellow,
    Green,
    Pink,
    Blue,
    Red,
    GrayOverlap,
    Highlight,
    Green2,
    Cyan,
    Magenta,
    Yellow2,
}

impl KnownColor {
    fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Black,
            1 => Self::Gray,
            2 => Self::White,
            3 => Self::Yellow,
            4 => Self::Green,
            5 => Self::Pink,
            6 => Self::Blue,
            7 => Self::Red,
            8 => Self::GrayOverlap,
            9 => Self::Highlight,
            10 => Self::Green2,
            11 => Self::Cyan,
            12 => Self::Magenta,
            13 => Self::Yellow2,
            _ => return None,
        })
    }

    fn rgb(self) -> Rgb {
        match self {
            Self::Black => Rgb(0, 0, 0),
            Self::Gray => Rgb(125, 125, 125),
            Self::White => Rgb(255, 255, 255),
            Self::Yellow => Rgb(255, 235, 59),
            Self::Green => Rgb(76, 175, 80),
            Self::Pink => Rgb(233, 30, 99),
            Self::Blue => Rgb(48, 74, 224),
            Self::Red => Rgb(244, 67, 54),
            Self::GrayOverlap => Rgb(158, 158, 158),
            Self::Highlight => Rgb(255, 235, 59),
            Self::Green2 => Rgb(139, 195, 74),
            Self::Cyan => Rgb(0, 188, 212),
            Self::Magenta => Rgb(156, 39, 176),
            Self::Yellow2 => Rgb(255, 193, 7),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_colors_fall_back_to_black() {
        assert_eq!(Color::new(999).rgb(), Rgb(0, 0, 0));
    }

    #[test]
    fn known_colors_resolve() {
        assert_eq!(Color::new(7).rgb(), Rgb(244, 67, 54));
    }
}
