//! Fixed instructions sent alongside the image pair.
//!
//! The first image part is always the base, the second the lighting reference;
//! both templates refer to them in that order.

const INITIAL_PROMPT: &str = r#"
GOAL: Produce a visual variation of the 'Base Image' (the first image) by applying the lighting and atmosphere (mood) of the 'Reference Image' (the second image). The result must blend what is analysed in the Base Image with what is analysed in the Reference Image.

BASE IMAGE ANALYSIS:
- Architectural geometry and composition.
- Surface finishes and materials (textures, reflections).
- Frame proportion (aspect ratio) and camera framing.

REFERENCE IMAGE ANALYSIS:
- Overall lighting and atmosphere (mood).
- Colours, colour temperature and global illumination (GI).
- Direction, colour and softness of shadows.
- Contrast, intensity of whites and blacks.
- Vegetation tone.
- Fog level.
- Sky colours and composition.
- Intensity and colour of reflections.

STRICT RULES (DO NOT VIOLATE):
1. RIGOROUSLY PRESERVE the geometry, modelling, physical elements, framing and camera angle of the 'Base Image'. NO structural change is allowed.
2. KEEP THE ASPECT RATIO of the 'Base Image' exactly.
3. The only focus of the change is LIGHTING and ATMOSPHERE. Alter the materials of the 'Base Image' only when strictly necessary to keep the new lighting coherent (e.g. a day scene turned into night).
4. COMPLETELY IGNORE foreground vegetation in the Reference Image. Foreground framing elements must stay faithful to the Base Image.
5. The final result must have high-quality photorealism, suitable for professional ArchViz presentation.
"#;

const REVARIATION_PROMPT: &str = r#"
GOAL: Using the 'Base Image' (the first image, an already generated variation) and the original 'Reference Image' (the second image), produce a new alternative close to the 'Base Image' but with small, subtle variations in colour and light intensity. Keep the overall atmosphere of the 'Reference Image'.

STRICT RULES (DO NOT VIOLATE):
1. RIGOROUSLY PRESERVE the geometry, modelling, physical elements, framing and camera angle of the 'Base Image'.
2. KEEP THE ASPECT RATIO of the 'Base Image' exactly.
3. COMPLETELY IGNORE foreground vegetation in the Reference Image. Foreground framing elements must stay faithful to the Base Image.
4. The final result must have high-quality photorealism.
"#;

/// Which instruction a batch is sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// First pass: transfer the reference mood onto the base render
    Initial,
    /// Subtle variant of an already generated result
    Revariation,
}

impl PromptKind {
    pub fn text(&self) -> &'static str {
        match self {
            PromptKind::Initial => initial_prompt(),
            PromptKind::Revariation => revariation_prompt(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Initial => "initial",
            PromptKind::Revariation => "revariation",
        }
    }
}

pub fn initial_prompt() -> &'static str {
    INITIAL_PROMPT
}

pub fn revariation_prompt() -> &'static str {
    REVARIATION_PROMPT
}
