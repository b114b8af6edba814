use super::{owned, BuildContext};
use crate::config::CoreConfig;
use crate::constants::{
    DEFAULT_LOCAL_EXTENSION, EVENT_CODE_UPDATE_RECORD, EVENT_DISPLAY_UPDATE_RECORD,
    EXTENSION_MESSAGE_HANDLING, PROFILE_MESSAGE_HEADER, SYSTEM_MESSAGE_EVENT,
    SYSTEM_RECIPIENT_TYPE,
};
use crate::request::MessageHeaderOptions;
use fhir::{Coding, Extension, ExtensionValue, MessageHeader, MessageSource, Reference};
use gpupdate_uuid::{FullUrl, ResourceIdentity};

/// Display text for an ITK recipient-type code; unknown codes have none.
pub fn recipient_type_display(code: &str) -> Option<&'static str> {
    match code {
        "FI" => Some("For Information"),
        "FA" => Some("For Action"),
        _ => None,
    }
}

/// Build the message header.
///
/// Acknowledgement flags and recipient type fall back to `config` when the request does not
/// override them. `sender` is the header organisation and `focus` the document bundle.
pub fn build_message_header(
    identity: &ResourceIdentity,
    options: Option<&MessageHeaderOptions>,
    config: &CoreConfig,
    system_name: &str,
    sender: &FullUrl,
    focus: &FullUrl,
    ctx: &BuildContext,
) -> MessageHeader {
    MessageHeader {
        id: identity.id(),
        meta: ctx.meta(PROFILE_MESSAGE_HEADER),
        extension: vec![handling_extension(options, config)],
        event: Coding::new(SYSTEM_MESSAGE_EVENT, EVENT_CODE_UPDATE_RECORD)
            .with_display(Some(EVENT_DISPLAY_UPDATE_RECORD.to_owned())),
        sender: Some(Reference::to(sender)),
        timestamp: ctx.last_updated.clone(),
        source: MessageSource {
            name: owned(Some(system_name)),
            endpoint: config.sender_mesh_mailbox().to_owned(),
        },
        focus: vec![Reference::to(focus)],
    }
}

fn handling_extension(options: Option<&MessageHeaderOptions>, config: &CoreConfig) -> Extension {
    let opts = options.cloned().unwrap_or_default();

    let bus_ack = opts
        .business_ack_requested
        .unwrap_or_else(|| config.default_business_ack_requested());
    let inf_ack = opts
        .infrastructure_ack_requested
        .unwrap_or_else(|| config.default_infrastructure_ack_requested());
    let recipient = owned(opts.recipient_type.as_deref())
        .unwrap_or_else(|| config.default_recipient_type().to_owned());

    let mut children = vec![
        Extension::with_value("BusAckRequested", ExtensionValue::Boolean(bus_ack)),
        Extension::with_value("InfAckRequested", ExtensionValue::Boolean(inf_ack)),
        Extension::with_value(
            "RecipientType",
            ExtensionValue::Coding(
                Coding::new(SYSTEM_RECIPIENT_TYPE, recipient.as_str())
                    .with_display(recipient_type_display(&recipient).map(str::to_owned)),
            ),
        ),
    ];

    if let Some(definition) = owned(opts.message_definition_ref.as_deref()) {
        children.push(Extension::with_value(
            "MessageDefinition",
            ExtensionValue::Reference(Reference::external(definition)),
        ));
    }
    if let Some(sender_ref) = owned(opts.sender_reference.as_deref()) {
        children.push(Extension::with_value(
            "SenderReference",
            ExtensionValue::String(sender_ref),
        ));
    }

    let local = owned(opts.local_extension.as_deref())
        .unwrap_or_else(|| DEFAULT_LOCAL_EXTENSION.to_owned());
    children.push(Extension::with_value(
        "LocalExtension",
        ExtensionValue::String(local),
    ));

    Extension::nested(EXTENSION_MESSAGE_HANDLING, children)
}
