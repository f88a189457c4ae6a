use super::call;
use crate::{Call, CallError, CallState};

impl TryFrom<call::Model> for Call {
    type Error = CallError;

    fn try_from(model: call::Model) -> Result<Self, Self::Error> {
        let state = CallState::parse(&model.state).ok_or_else(|| {
            CallError::internal(format!(
                "call {} has unknown state {}",
                model.call_id, model.state
            ))
        })?;

        Ok(Call {
            call_id: model.call_id,
            caller_identity: model.caller_identity,
            callee_identity: model.callee_identity,
            room_name: model.room_name,
            state,
            created_at: model.created_at,
            answered_at: model.answered_at,
            ended_at: model.ended_at,
        })
    }
}
