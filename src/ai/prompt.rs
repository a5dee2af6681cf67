//! Prompt construction for the Gemini calls.

use super::{ComposerItem, RenderItem};
use crate::models::{Occasion, Weather};

pub const CLASSIFY_PROMPT: &str = "Analyse this photo of a single clothing item and describe it \
as JSON following the response schema. Be precise: give a short descriptive name, the category, \
the dominant color, the style and the main material.";

pub fn compose_prompt(
    wardrobe: &[ComposerItem],
    weather: &Weather,
    occasion: Occasion,
) -> Result<String, serde_json::Error> {
    let wardrobe_json = serde_json::to_string(wardrobe)?;
    Ok(format!(
        r#"Here is my virtual wardrobe as JSON. Every item has a unique string 'id':
{wardrobe_json}

Conditions:
- Weather: {condition}, {temperature}°C
- Occasion: {occasion}

Important rule: some items belong to a set, identified by 'setId'. If you use an item that has a
'setId', you MUST include every other item with the same 'setId' in the same outfit. Never split
the items of a set.

Create 3 complete, coherent and stylish outfits suited to these conditions.
For each outfit give a name, a description and the list of item ids (strings) it uses.
Each outfit must contain at least a top, a bottom and footwear.
Only use items that are present in the wardrobe above.
Return a JSON array matching the response schema."#,
        condition = weather.condition.as_str(),
        temperature = weather.temperature_c,
        occasion = occasion.as_str(),
    ))
}

pub fn render_prompt(items: &[RenderItem]) -> String {
    let pieces = items
        .iter()
        .map(|i| format!("{} ({})", i.name, i.color))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Create a photorealistic image of a fashion outfit, either on a mannequin or as a flat lay. \
The outfit is made of: {pieces}. The style should be modern, chic and clean, worthy of a fashion \
magazine. The background must be neutral and tasteful, in grey or beige tones. Do not show a \
recognisable human face."
    )
}

pub fn analysis_prompt(wardrobe: &[ComposerItem]) -> Result<String, serde_json::Error> {
    let wardrobe_json = serde_json::to_string(wardrobe)?;
    Ok(format!(
        r#"As an expert stylist, analyse the following wardrobe:
{wardrobe_json}

Identify the single most important missing type of item that would most increase the versatility
of this wardrobe. Give a concise suggestion for one or two items and a one-sentence justification.
Focus on versatile basics. Return JSON matching the response schema."#
    ))
}
