use chrono::Utc;
use serde_json::Value;

use crate::models::payment::MAKE_PAYMENT_RESPONSE_FIELD;
use crate::models::update_action::{
    InteractionFields, TransactionDraft, TransactionState, TransactionType, INTERACTION_TYPE_KEY,
};
use crate::models::{PaymentRecord, PaymentRequest, TypeKeyReference, UpdateAction};

pub const MAKE_PAYMENT_INTERACTION: &str = "makePayment";

/// Records one provider exchange as an interface interaction. Both strings are
/// stored exactly as given.
pub fn record_interaction(request: &str, response: &str) -> UpdateAction {
    UpdateAction::AddInterfaceInteraction {
        interaction_type: TypeKeyReference::new(INTERACTION_TYPE_KEY),
        fields: InteractionFields {
            interaction_type: MAKE_PAYMENT_INTERACTION.to_string(),
            request: request.to_string(),
            response: response.to_string(),
            created_at: Utc::now(),
        },
    }
}

/// Maps the provider's `resultCode` to the state of the authorization
/// transaction. Codes without a clear outcome (e.g. `RedirectShopper`) get no
/// transaction yet.
pub fn transaction_state(result_code: &str) -> Option<TransactionState> {
    match result_code {
        "Authorised" => Some(TransactionState::Success),
        "Received" | "Pending" => Some(TransactionState::Pending),
        "Refused" | "Error" | "Cancelled" => Some(TransactionState::Failure),
        _ => None,
    }
}

/// Actions that follow an accepted make-payment call, in the order they are
/// applied after the interaction itself.
pub fn accepted_payment_actions(
    payment: &PaymentRecord,
    request: &PaymentRequest,
    response: &Value,
    response_text: &str,
) -> Vec<UpdateAction> {
    let mut actions = vec![UpdateAction::SetCustomField {
        name: MAKE_PAYMENT_RESPONSE_FIELD.to_string(),
        value: response_text.to_string(),
    }];

    let state = response
        .get("resultCode")
        .and_then(Value::as_str)
        .and_then(transaction_state);
    if let (Some(state), Some(amount)) = (state, payment.amount_planned.clone()) {
        actions.push(UpdateAction::AddTransaction {
            transaction: TransactionDraft {
                transaction_type: TransactionType::Authorization,
                amount,
                interaction_id: response
                    .get("pspReference")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                state,
            },
        });
    }

    if payment.key.as_deref().map_or(true, str::is_empty) {
        actions.push(UpdateAction::SetKey {
            key: request.reference.clone(),
        });
    }

    let method = request.payment_method_type();
    if payment.payment_method_info.method.as_deref() != Some(method) {
        actions.push(UpdateAction::SetMethodInfoMethod {
            method: method.to_string(),
        });
    }

    actions
}
