//! Pen/tool identifiers. The device firmware has assigned most tools a second numeric id over
//! time (`_2` variants), with gaps left in between; unrecognised ids are kept around rather than
//! rejected since they still carry a stroke worth rendering.

/// A tool id, resolved against the known table where possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pen {
    Known(KnownPen),
    Unknown(u32),
}

impl Pen {
    pub(crate) fn new(id: u32) -> Self {
        match KnownPen::from_id(id) {
            Some(pen) => Self::Known(pen),
            None => Self::Unknown(id),
        }
    }

    /// The base stroke width (output units, pre-scale) for this tool, used when a stroke's
    /// per-point widths are all zero.
    pub(crate) fn base_width(&self) -> f32 {
        match self {
            Self::Known(pen) => pen.base_width(),
            // Spec only defines a generic fallback implicitly via "pen=generic"; re-use the
            // fineliner's width as the thinnest, least surprising default.
            Self::Unknown(_) => KnownPen::Fineliner.base_width(),
        }
    }

    /// Tools that render transparent/overlapping ink (highlighters, the shader pen).
    pub(crate) fn is_transparent(&self) -> bool {
        matches!(
            self,
            Self::Known(KnownPen::Highlighter | KnownPen::Highlighter2 | KnownPen::Shader)
        )
    }

    /// Tools that remove ink rather than draw it; strokes using these never reach the canvas.
    pub(crate) fn is_eraser(&self) -> bool {
        matches!(self, Self::Known(KnownPen::Eraser | KnownPen::EraserArea))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownPen {
    Paintbrush,
    Pencil,
    Ballpoint,
    Marker,
    Fineliner,
    Highlighter,
    Eraser,
    MechanicalPencil,
    EraserArea,
    Paintbrush2,
    MechanicalPencil2,
    Pencil2,
    Ballpoint2,
    Marker2,
    Fineliner2,
    Highlighter2,
    Caligraphy,
    Shader,
}

impl KnownPen {
    fn from_id(id: u32) -> Option<Self> {
        Some(match id {
            0 => Self::Paintbrush,
            1 => Self::Pencil,
            2 => Self::Ballpoint,
            3 => Self::Marker,
            4 => Self::Fineliner,
            5 => Self::Highlighter,
            6 => Self::Eraser,
            7 => Self::MechanicalPencil,
            8 => Self::EraserArea,
            12 => Self::Paintbrush2,
            13 => Self::MechanicalPencil2,
            14 => Self::Pencil2,
            15 => Self::Ballpoint2,
            16 => Self::Marker2,
            17 => Self::Fineliner2,
            18 => Self::Highlighter2,
            21 => Self::Caligraphy,
            23 => Self::Shader,
            _ => return None,
        })
    }

    /// The `_2` variants inherit their base type's width.
    fn base_width(self) -> f32 {
        match self {
            Self::Paintbrush | Self::Paintbrush2 => 3.0,
            Self::Pencil | Self::Pencil2 => 1.5,
            Self::Ballpoint | Self::Ballpoint2 => 1.2,
            Self::Marker | Self::Marker2 => 4.0,
            Self::Fineliner | Self::Fineliner2 => 0.8,
            Self::Highlighter | Self::Highlighter2 => 12.0,
            Self::Eraser => 5.0,
            Self::MechanicalPencil | Self::MechanicalPencil2 => 0.6,
            Self::EraserArea => 5.0,
            Self::Caligraphy => 2.5,
            Self::Shader => 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_round_trip() {
        assert_eq!(Pen::new(999), Pen::Unknown(999));
    }

    #[test]
    fn deliberate_holes_are_unknown() {
        for hole in [9, 10, 11, 19, 20, 22] {
            assert_eq!(Pen::new(hole), Pen::Unknown(hole));
        }
    }

    #[test]
    fn erasers_are_excluded() {
        assert!(Pen::new(6).is_eraser());
        assert!(Pen::new(8).is_eraser());
        assert!(!Pen::new(0).is_eraser());
    }

    #[test]
    fn highlighters_and_shader_are_transparent() {
        assert!(Pen::new(5).is_transparent());
        assert!(Pen::new(18).is_transparent());
        assert!(Pen::new(23).is_transparent());
        assert!(!Pen::new(4).is_transparent());
    }
}
