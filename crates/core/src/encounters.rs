//! Primary-encounter resolution.
//!
//! A request may carry an encounter list, a single encounter, both, or neither. Exactly one
//! encounter is rendered as primary:
//!
//! 1. a non-empty list: the first entry tagged `"primary"`, else index 0
//! 2. otherwise the single encounter, when present
//! 3. otherwise an empty placeholder
//!
//! Every other list entry becomes a related encounter, rendered from its own fields.

use crate::constants::PRIMARY_ENCOUNTER_ROLE;
use crate::request::{EncounterInput, UpdateRecordRequest};
use gpupdate_types::non_blank;
use std::borrow::Cow;

/// Which rule selected the primary encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimarySource {
    TaggedPrimary,
    FirstInList,
    Single,
    Placeholder,
}

#[derive(Clone, Debug)]
pub struct EncounterSelection<'a> {
    pub primary: Cow<'a, EncounterInput>,
    /// Index into the request list, when the primary came from it.
    pub primary_index: Option<usize>,
    pub related: Vec<&'a EncounterInput>,
    pub source: PrimarySource,
}

fn is_tagged_primary(encounter: &EncounterInput) -> bool {
    encounter.role.as_deref().map(str::trim) == Some(PRIMARY_ENCOUNTER_ROLE)
}

pub fn resolve_encounters(req: &UpdateRecordRequest) -> EncounterSelection<'_> {
    if let Some(list) = req.encounters.as_deref().filter(|l| !l.is_empty()) {
        let (index, source) = match list.iter().position(is_tagged_primary) {
            Some(i) => (i, PrimarySource::TaggedPrimary),
            None => (0, PrimarySource::FirstInList),
        };
        let related = list
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, e)| e)
            .collect();

        return EncounterSelection {
            primary: Cow::Borrowed(&list[index]),
            primary_index: Some(index),
            related,
            source,
        };
    }

    match &req.encounter {
        Some(single) => EncounterSelection {
            primary: Cow::Borrowed(single),
            primary_index: None,
            related: Vec::new(),
            source: PrimarySource::Single,
        },
        None => EncounterSelection {
            primary: Cow::Owned(EncounterInput::default()),
            primary_index: None,
            related: Vec::new(),
            source: PrimarySource::Placeholder,
        },
    }
}

/// ODS code for the sender and service-provider organisations.
///
/// Precedence, lowest to highest: the configured fallback, the single encounter's performer
/// code, the performer code of the first list entry tagged `"primary"` that has one.
pub fn resolve_sender_ods(req: &UpdateRecordRequest, fallback: &str) -> String {
    let tagged = req
        .encounters
        .iter()
        .flatten()
        .filter(|e| is_tagged_primary(e))
        .find_map(|e| non_blank(e.performer_ods.as_deref()));

    let single = req
        .encounter
        .as_ref()
        .and_then(|e| non_blank(e.performer_ods.as_deref()));

    tagged.or(single).unwrap_or(fallback).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn encounter(role: Option<&str>, reason: &str) -> EncounterInput {
        EncounterInput {
            role: role.map(str::to_owned),
            reason: Some(reason.to_owned()),
            ..Default::default()
        }
    }

    fn with_list(list: Vec<EncounterInput>) -> UpdateRecordRequest {
        UpdateRecordRequest {
            encounters: Some(list),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(0, 3)]
    #[case(1, 3)]
    #[case(2, 3)]
    #[case(4, 5)]
    fn tagged_entry_is_selected_wherever_it_sits(#[case] k: usize, #[case] len: usize) {
        let list = (0..len)
            .map(|i| encounter((i == k).then_some("primary"), &format!("e{i}")))
            .collect();
        let req = with_list(list);

        let selection = resolve_encounters(&req);

        assert_eq!(selection.primary_index, Some(k));
        assert_eq!(selection.source, PrimarySource::TaggedPrimary);
        assert_eq!(selection.primary.reason.as_deref(), Some(format!("e{k}").as_str()));
        assert_eq!(selection.related.len(), len - 1);
    }

    #[rstest]
    #[case(vec![None, None])]
    #[case(vec![Some("secondary"), None, Some("other")])]
    fn untagged_list_falls_back_to_first(#[case] roles: Vec<Option<&str>>) {
        let list = roles
            .iter()
            .enumerate()
            .map(|(i, r)| encounter(*r, &format!("e{i}")))
            .collect();
        let req = with_list(list);

        let selection = resolve_encounters(&req);

        assert_eq!(selection.primary_index, Some(0));
        assert_eq!(selection.source, PrimarySource::FirstInList);
    }

    #[test]
    fn first_of_several_tagged_entries_wins() {
        let req = with_list(vec![
            encounter(None, "a"),
            encounter(Some("primary"), "b"),
            encounter(Some("primary"), "c"),
        ]);
        assert_eq!(resolve_encounters(&req).primary_index, Some(1));
    }

    #[test]
    fn related_encounters_keep_their_own_fields_in_order() {
        let req = with_list(vec![
            encounter(None, "a"),
            encounter(Some("primary"), "b"),
            encounter(None, "c"),
        ]);
        let reasons: Vec<_> = resolve_encounters(&req)
            .related
            .iter()
            .filter_map(|e| e.reason.as_deref())
            .collect();
        assert_eq!(reasons, vec!["a", "c"]);
    }

    #[test]
    fn single_encounter_is_primary_without_list() {
        let req = UpdateRecordRequest {
            encounter: Some(encounter(None, "solo")),
            encounters: Some(Vec::new()),
            ..Default::default()
        };
        let selection = resolve_encounters(&req);

        assert_eq!(selection.source, PrimarySource::Single);
        assert_eq!(selection.primary.reason.as_deref(), Some("solo"));
        assert!(selection.related.is_empty());
    }

    #[test]
    fn placeholder_when_no_encounters() {
        let req = UpdateRecordRequest::default();
        let selection = resolve_encounters(&req);
        assert_eq!(selection.source, PrimarySource::Placeholder);
        assert_eq!(*selection.primary, EncounterInput::default());
    }

    #[test]
    fn sender_ods_precedence() {
        let mut req = UpdateRecordRequest::default();
        assert_eq!(resolve_sender_ods(&req, "A(*)"), "A(*)");

        req.encounter = Some(EncounterInput {
            performer_ods: Some("SINGLE".into()),
            ..Default::default()
        });
        assert_eq!(resolve_sender_ods(&req, "A(*)"), "SINGLE");

        req.encounters = Some(vec![
            EncounterInput {
                performer_ods: Some("UNTAGGED".into()),
                ..Default::default()
            },
            EncounterInput {
                role: Some("primary".into()),
                performer_ods: Some("TAGGED".into()),
                ..Default::default()
            },
        ]);
        assert_eq!(resolve_sender_ods(&req, "A(*)"), "TAGGED");
    }

    #[test]
    fn untagged_list_performer_does_not_override() {
        let req = with_list(vec![EncounterInput {
            performer_ods: Some("UNTAGGED".into()),
            ..Default::default()
        }]);
        assert_eq!(resolve_sender_ods(&req, "A(*)"), "A(*)");
    }
}
