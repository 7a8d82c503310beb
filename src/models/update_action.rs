use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{Money, TypeKeyReference};

/// Custom type of interface interactions written by the bridge.
pub const INTERACTION_TYPE_KEY: &str = "ctp-adyen-integration-interaction-payment-type";

/// Update action for the payment record, in the commerce platform's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UpdateAction {
    AddInterfaceInteraction {
        #[serde(rename = "type")]
        interaction_type: TypeKeyReference,
        fields: InteractionFields,
    },
    SetCustomField {
        name: String,
        value: String,
    },
    AddTransaction {
        transaction: TransactionDraft,
    },
    SetKey {
        key: String,
    },
    SetMethodInfoMethod {
        method: String,
    },
}

impl UpdateAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddInterfaceInteraction { .. } => "addInterfaceInteraction",
            Self::SetCustomField { .. } => "setCustomField",
            Self::AddTransaction { .. } => "addTransaction",
            Self::SetKey { .. } => "setKey",
            Self::SetMethodInfoMethod { .. } => "setMethodInfoMethod",
        }
    }

    pub fn interaction(&self) -> Option<&InteractionFields> {
        match self {
            Self::AddInterfaceInteraction { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Recorded request/response pair. `request` and `response` hold the exact
/// JSON strings exchanged with the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionFields {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub request: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    pub state: TransactionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Authorization,
    Charge,
    Refund,
    CancelAuthorization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Initial,
    Pending,
    Success,
    Failure,
}

/// Body returned to the commerce platform for an extension call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateActions {
    pub actions: Vec<UpdateAction>,
}

impl UpdateActions {
    pub fn new(actions: Vec<UpdateAction>) -> Self {
        Self { actions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn interaction(&self) -> Option<&InteractionFields> {
        self.actions.iter().find_map(UpdateAction::interaction)
    }
}
