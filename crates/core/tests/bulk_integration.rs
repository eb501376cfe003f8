//! Bulk delete/update against the in-memory provider.

mod support;

use std::error::Error as _;

use crmbatch_core::CrmClient;
use crmbatch_domain::{CrmError, PaginationConfig};
use futures::TryStreamExt;
use serde_json::{json, Value};
use support::{ids, Call, FakeCrm};

fn client(crm: &FakeCrm) -> CrmClient {
    CrmClient::new(crm.clone().into_transport(), PaginationConfig::default())
}

fn json_ids(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| json!(id)).collect()
}

#[tokio::test]
async fn non_integer_id_rejects_the_whole_batch() {
    let crm = FakeCrm::with_ids(ids(10));
    let err = client(&crm).delete_many("x.delete", &[json!(5), json!("bad"), json!(7)]).unwrap_err();

    match &err {
        CrmError::InvalidArgumentKind { index, value, kind } => {
            assert_eq!(*index, 1);
            assert_eq!(value, "\"bad\"");
            assert_eq!(kind, "string");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("index 1"));
    assert_eq!(crm.call_count(), 0);
    assert_eq!(crm.stored_ids(), ids(10));
}

#[tokio::test]
async fn delete_many_yields_outcomes_in_input_order() {
    let crm = FakeCrm::with_ids(ids(120));
    let targets: Vec<i64> = (1..=60).rev().collect();

    let outcomes = client(&crm).delete_many("crm.deal.delete", &json_ids(&targets)).unwrap().collect_all().await.unwrap();

    assert_eq!(outcomes.len(), 60);
    for (position, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.index, position);
        assert_eq!(outcome.id, targets[position]);
        assert_eq!(outcome.result, json!(true));
    }
    assert_eq!(crm.stored_ids(), (61..=120).collect::<Vec<_>>());

    let groups: Vec<(usize, bool)> = crm
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Grouped { commands, halt } => Some((commands.len(), *halt)),
            Call::Direct { .. } => None,
        })
        .collect();
    assert_eq!(groups, vec![(50, true), (10, true)]);
    assert_eq!(crm.grouped_commands()[0].params(), json!({"id": 60}).as_object().unwrap());
}

#[tokio::test]
async fn groups_are_sent_only_when_pulled() {
    let crm = FakeCrm::with_ids(ids(120));
    let mut write = client(&crm).delete_many("crm.deal.delete", &json_ids(&ids(75))).unwrap();
    assert_eq!(write.len(), 75);
    assert_eq!(crm.call_count(), 0);

    write.next_outcome().await.unwrap().unwrap();
    assert_eq!(crm.grouped_calls(), 1);
    assert_eq!(crm.stored_ids().len(), 70);
}

#[tokio::test]
async fn update_many_accepts_wrapped_and_bare_fields() {
    let crm = FakeCrm::with_ids(ids(5));
    let items = vec![
        (json!(3), json!({"fields": {"TITLE": "Renewal"}})),
        (json!(4), json!({"TITLE": "Upsell", "OPPORTUNITY": 1200})),
    ];

    let outcomes: Vec<_> =
        client(&crm).update_many("crm.deal.update", items).unwrap().into_stream().try_collect().await.unwrap();

    assert_eq!(outcomes.iter().map(|o| (o.index, o.id)).collect::<Vec<_>>(), vec![(0, 3), (1, 4)]);
    assert_eq!(crm.row(3).unwrap()["TITLE"], json!("Renewal"));
    assert_eq!(crm.row(4).unwrap()["OPPORTUNITY"], json!(1200));

    let commands = crm.grouped_commands();
    assert_eq!(commands[0].params()["fields"], json!({"TITLE": "Renewal"}));
}

#[tokio::test]
async fn update_many_validates_keys_before_sending() {
    let crm = FakeCrm::with_ids(ids(5));
    let items = vec![(json!(1), json!({"TITLE": "a"})), (json!(2.5), json!({"TITLE": "b"}))];

    let err = client(&crm).update_many("crm.deal.update", items).unwrap_err();
    assert!(matches!(err, CrmError::InvalidArgumentKind { index: 1, ref kind, .. } if kind == "float"));
    assert_eq!(crm.call_count(), 0);
}

#[tokio::test]
async fn remote_failure_halts_and_wraps() {
    support::init_tracing();
    let crm = FakeCrm::with_ids(ids(10)).failing_id(7);
    let mut write = client(&crm).delete_many("crm.deal.delete", &json_ids(&[5, 6, 7, 8, 9])).unwrap();

    let mut applied = Vec::new();
    let err = loop {
        match write.next_outcome().await {
            Ok(Some(outcome)) => applied.push(outcome.id),
            Ok(None) => panic!("write should fail"),
            Err(err) => break err,
        }
    };

    assert_eq!(applied, vec![5, 6]);
    assert!(matches!(err, CrmError::BatchExecution { .. }));
    assert!(err.to_string().contains("item 2"));
    let cause = err.source().expect("cause");
    assert!(cause.to_string().contains("ACCESS_DENIED"));

    assert_eq!(crm.stored_ids(), vec![1, 2, 3, 4, 7, 8, 9, 10]);
    assert_eq!(write.next_outcome().await.unwrap(), None);
}

#[tokio::test]
async fn transport_failure_is_wrapped() {
    let crm = FakeCrm::with_ids(ids(3)).failing_grouped_call(0);
    let err = client(&crm).delete_many("crm.deal.delete", &json_ids(&[1, 2])).unwrap().collect_all().await.unwrap_err();

    match err {
        CrmError::BatchExecution { cause, .. } => {
            assert!(matches!(*cause, CrmError::RemoteCall { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn empty_input_sends_nothing() {
    let crm = FakeCrm::with_ids(ids(3));
    let outcomes = client(&crm).delete_many("crm.deal.delete", &[]).unwrap().collect_all().await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(crm.call_count(), 0);
}

#[tokio::test]
async fn health_check_reports_reachability() {
    let crm = FakeCrm::with_ids(ids(1));
    assert!(client(&crm).health_check().await);
    assert!(!client(&crm).with_health_method("server.nope").health_check().await);
}
