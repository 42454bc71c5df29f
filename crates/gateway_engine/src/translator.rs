//! Metadata translation.
//!
//! Every source field change goes through [`apply_metadata`]. Players
//! intercept three fields (custom name, absorption, shoulders); every other
//! field, and every field on other kinds, falls through to the passthrough
//! table on [`SourceField::passthrough_target`].

use gateway_entity::{MetadataValue, SourceField, TargetField};
use gateway_protocol::{Attribute, TargetPacket};
use tracing::trace;

use crate::context::SessionContext;
use crate::error::EngineError;
use crate::model::{EntityModel, KindData};
use crate::synthesizer::{self, ShoulderSlot};

/// Name of the synthetic attribute carrying extra health.
pub const ABSORPTION_ATTRIBUTE: &str = "minecraft:absorption";

/// Apply one source metadata change to `model`.
///
/// # Errors
///
/// - [`EngineError::UnrepresentableField`] if the field has no target
///   translation. Nothing is written in that case.
/// - [`EngineError::SynthesisFailure`] if a shoulder tag needed a decoration
///   that could not be spawned.
pub fn apply_metadata(
    model: &mut EntityModel,
    field: SourceField,
    value: MetadataValue,
    ctx: &mut SessionContext<'_>,
) -> Result<(), EngineError> {
    if model.is_player() {
        match field {
            SourceField::CustomName => {
                apply_display_name(model, value.as_text().map(str::to_owned), ctx);
                return Ok(());
            }
            SourceField::Absorption => {
                let amount = value
                    .as_float()
                    .ok_or(EngineError::UnrepresentableField(field.index()))?;
                apply_absorption(model, amount, ctx);
                return Ok(());
            }
            SourceField::LeftShoulder | SourceField::RightShoulder => {
                if let Some(slot) = ShoulderSlot::from_field(field) {
                    return synthesizer::apply_shoulder_tag(model, slot, &value, ctx);
                }
            }
            _ => {}
        }
    }
    passthrough(model, field, value, ctx)
}

/// Re-run the team lookup for a player's current display name and rewrite
/// its name tag. Used when the name changes and when it is first announced.
pub(crate) fn refresh_name_tag(model: &mut EntityModel, ctx: &SessionContext<'_>) {
    let KindData::Player(player) = &model.data else {
        return;
    };
    let name = player.display_name();
    let tag = match ctx.teams.team_for(name) {
        Some(team) => team.decorate(name),
        None => name.to_owned(),
    };
    model
        .metadata
        .set(TargetField::Nametag, MetadataValue::Text(Some(tag)));
    model.emit_metadata(&[TargetField::Nametag], ctx);
}

fn apply_display_name(model: &mut EntityModel, name: Option<String>, ctx: &SessionContext<'_>) {
    if let KindData::Player(player) = &mut model.data {
        player.display_name = name.filter(|name| !name.is_empty());
    }
    refresh_name_tag(model, ctx);
}

fn apply_absorption(model: &mut EntityModel, amount: f32, ctx: &SessionContext<'_>) {
    let attribute = Attribute {
        name: ABSORPTION_ATTRIBUTE.to_string(),
        min: 0.0,
        max: ctx.config.absorption_max,
        value: amount,
        default: amount,
    };
    model
        .attributes
        .insert(ABSORPTION_ATTRIBUTE.to_string(), attribute.clone());
    if model.valid && !model.target_id.is_local_player() {
        ctx.emit(TargetPacket::UpdateAttributes {
            target_id: model.target_id,
            attributes: vec![attribute],
        });
    }
}

fn passthrough(
    model: &mut EntityModel,
    field: SourceField,
    value: MetadataValue,
    ctx: &SessionContext<'_>,
) -> Result<(), EngineError> {
    let Some(target) = field.passthrough_target() else {
        trace!(target_id = %model.target_id, field = field.index(), "no translation");
        return Err(EngineError::UnrepresentableField(field.index()));
    };
    model.metadata.set(target, value);
    model.emit_metadata(&[target], ctx);
    Ok(())
}
