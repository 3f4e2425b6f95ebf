//! Builds the user turn sent for every submitted image.

use vision_relay_core::{ContentPart, SessionId, SessionStore, StoreError, Turn};

/// Instruction attached to every request.
///
/// The output format and language directives are for the model; nothing in
/// the relay interprets the reply.
pub const INSTRUCTION_TEXT: &str = "look for recyclable items in the image provided. if any item is recyclable then first give a writeup about how it can be recycled but stick to methods that can be done at home or its easy. also include ways in which it can be reused if you find the object to be in good condition but again stick to scopes that can be useful around the household or easily accessible places, you can also include ways in which it can be used as items for handicrafts, or similar things that high school children find interesting; give ideas. also if there are multiple objects then you can list their recycle uses one after another. after that just print a json in a specific format like object: plastic; recycle: true, object: aluminium; recycle: true and so on. if the image is out of context just say 'out of context'. dont give me replies that like a markdown, instead keep it to plain text. pls give me the reply in ARABIC.";

/// Build the user turn: instruction text, then the image reference if any.
///
/// The image reference is forwarded untouched; an empty reference counts as
/// no image.
#[must_use]
pub fn compose_user_turn(image_data_url: Option<&str>) -> Turn {
    let mut content = vec![ContentPart::text(INSTRUCTION_TEXT)];
    if let Some(url) = image_data_url.filter(|url| !url.is_empty()) {
        content.push(ContentPart::image(url));
    }
    Turn::user(content)
}

/// Compose the user turn and append it to the session's log.
///
/// Returns the appended turn so a failed dispatch can retract it.
///
/// # Errors
/// Returns error if the session log cannot be written.
pub async fn append_user_turn(
    store: &dyn SessionStore,
    id: &SessionId,
    image_data_url: Option<&str>,
) -> Result<Turn, StoreError> {
    let turn = compose_user_turn(image_data_url);
    tracing::debug!(
        session = id.short(),
        bytes = turn.approx_bytes(),
        with_image = matches!(&turn, Turn::User { content } if content.len() > 1),
        "Appending user turn"
    );
    store.append(id, turn.clone()).await?;
    Ok(turn)
}
