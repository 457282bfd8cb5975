//! Repository behavior against a scripted client.
//!
//! The client replays canned replies in order and records every statement, so
//! these tests pin down both the results and the exact SQL sequence without a
//! database.

use relmap::{
    Association, Condition, EntityBinding, GenericClient, OrmError, OrmResult, PageRequest,
    Predicates, Record, Repository, Sortable, SqlType, Value,
};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

// ============================================
// Scripted client
// ============================================

enum Reply {
    Rows(Vec<Record>),
    Affected(u64),
    Fail(&'static str),
}

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self::default()
    }

    fn rows(self, rows: Vec<Record>) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Rows(rows));
        self
    }

    fn affected(self, n: u64) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Affected(n));
        self
    }

    fn fail(self, message: &'static str) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Fail(message));
        self
    }

    fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }

    fn params(&self, idx: usize) -> Vec<Value> {
        self.log.lock().unwrap()[idx].1.clone()
    }

    fn next(&self, sql: &str, params: &[Value]) -> Reply {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted statement: {sql}"))
    }
}

impl GenericClient for ScriptedClient {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Record>>> + Send {
        let reply = self.next(sql, params);
        async move {
            match reply {
                Reply::Rows(rows) => Ok(rows),
                Reply::Affected(_) => panic!("expected rows"),
                Reply::Fail(message) => Err(OrmError::Connection(message.to_string())),
            }
        }
    }

    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send {
        let reply = self.next(sql, params);
        async move {
            match reply {
                Reply::Affected(n) => Ok(n),
                Reply::Rows(_) => panic!("expected an affected-row count"),
                Reply::Fail(message) => Err(OrmError::Connection(message.to_string())),
            }
        }
    }
}

// ============================================
// Fixtures
// ============================================

#[derive(Debug, Default, Clone, PartialEq)]
struct Tag {
    id: String,
    name: String,
    reference_id: Option<String>,
    reference_type: String,
}

fn tag(id: &str, name: &str) -> Tag {
    Tag {
        id: id.into(),
        name: name.into(),
        reference_id: Some("DEFAULT".into()),
        reference_type: "ORGANIZATION".into(),
    }
}

fn tag_row(t: &Tag) -> Record {
    Record::from_pairs([
        ("id", Value::from(&t.id)),
        ("name", Value::from(&t.name)),
        ("reference_id", Value::from(t.reference_id.clone())),
        ("reference_type", Value::from(&t.reference_type)),
    ])
}

fn tags() -> Repository<Tag, String> {
    let binding = EntityBinding::<Tag>::builder("tags", &["id"])
        .column("id", SqlType::Text, |t: &Tag| t.id.clone(), |t, v| t.id = v)
        .column("name", SqlType::Text, |t: &Tag| t.name.clone(), |t, v| t.name = v)
        .column(
            "reference_id",
            SqlType::Text,
            |t: &Tag| t.reference_id.clone(),
            |t, v| t.reference_id = v,
        )
        .column(
            "reference_type",
            SqlType::Text,
            |t: &Tag| t.reference_type.clone(),
            |t, v| t.reference_type = v,
        )
        .build()
        .unwrap();
    Repository::new(Arc::new(binding))
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Api {
    id: String,
    name: String,
    tags: Vec<String>,
}

fn apis() -> Repository<Api, String> {
    let binding = EntityBinding::<Api>::builder("apis", &["id"])
        .column("id", SqlType::Text, |a: &Api| a.id.clone(), |a, v| a.id = v)
        .column("name", SqlType::Text, |a: &Api| a.name.clone(), |a, v| a.name = v)
        .build()
        .unwrap();
    let api_tags = Association::new(
        "api_tags",
        &["api_id"],
        &["tag"],
        |api: &Api| api.tags.iter().map(|t| vec![Value::from(t)]).collect(),
        |api: &mut Api, row: &Record| {
            api.tags.push(row.get_as("tag")?);
            Ok(())
        },
    )
    .unwrap();
    Repository::new(Arc::new(binding))
        .with_association(api_tags)
        .unwrap()
}

fn api_row(id: &str, name: &str, tag: Option<&str>) -> Record {
    Record::from_pairs([
        ("id", Value::from(id)),
        ("name", Value::from(name)),
        ("a0.api_id", tag.map_or(Value::Null, |_| Value::from(id))),
        ("a0.tag", Value::from(tag)),
    ])
}

const API_BY_ID: &str = "SELECT p.id, p.name, a0.api_id AS \"a0.api_id\", a0.tag AS \"a0.tag\" \
     FROM (SELECT id, name FROM apis WHERE id = $1) p LEFT JOIN api_tags a0 ON a0.api_id = p.id";

// ============================================
// Single-table CRUD
// ============================================

#[tokio::test]
async fn create_find_delete_round() {
    let repo = tags();
    let beta = tag("tag1", "Beta");
    let client = ScriptedClient::new()
        .affected(1)
        .rows(vec![tag_row(&beta)])
        .rows(vec![tag_row(&beta)])
        .affected(1)
        .rows(vec![]);

    let created = repo.create(&client, &beta).await.unwrap();
    assert_eq!(created, beta);

    let found = repo.find_by_id(&client, &"tag1".to_string()).await.unwrap();
    assert_eq!(found, Some(beta.clone()));

    assert_eq!(repo.delete(&client, &"tag1".to_string()).await.unwrap(), 1);
    assert_eq!(repo.find_by_id(&client, &"tag1".to_string()).await.unwrap(), None);

    assert_eq!(
        client.statements(),
        vec![
            "INSERT INTO tags (id, name, reference_id, reference_type) VALUES ($1, $2, $3, $4)",
            "SELECT id, name, reference_id, reference_type FROM tags WHERE id = $1",
            "SELECT id, name, reference_id, reference_type FROM tags WHERE id = $1",
            "DELETE FROM tags WHERE id = $1",
            "SELECT id, name, reference_id, reference_type FROM tags WHERE id = $1",
        ]
    );
    assert_eq!(
        client.params(0),
        vec![
            Value::from("tag1"),
            Value::from("Beta"),
            Value::from("DEFAULT"),
            Value::from("ORGANIZATION"),
        ]
    );
}

#[tokio::test]
async fn create_with_unconvertible_key_fails_before_any_statement() {
    let binding = EntityBinding::<Tag>::builder("tags", &["id"])
        .column("id", SqlType::Uuid, |t: &Tag| t.id.clone(), |t, v| t.id = v)
        .column("name", SqlType::Text, |t: &Tag| t.name.clone(), |t, v| t.name = v)
        .build()
        .unwrap();
    let repo: Repository<Tag, String> = Repository::new(Arc::new(binding));
    let client = ScriptedClient::new();

    let err = repo.create(&client, &tag("not-a-uuid", "x")).await.unwrap_err();
    match err {
        OrmError::Persistence { context, source } => {
            assert_eq!(context, "create tags");
            assert!(matches!(*source, OrmError::Decode { .. }), "{source:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.statements().is_empty());
}

#[tokio::test]
async fn update_binds_non_key_columns_then_key() {
    let repo = tags();
    let renamed = tag("tag1", "Gamma");
    let client = ScriptedClient::new()
        .affected(1)
        .rows(vec![tag_row(&renamed)]);

    let updated = repo.update(&client, &renamed).await.unwrap();
    assert_eq!(updated.name, "Gamma");
    assert_eq!(
        client.statements()[0],
        "UPDATE tags SET name = $1, reference_id = $2, reference_type = $3 WHERE id = $4"
    );
    assert_eq!(
        client.params(0),
        vec![
            Value::from("Gamma"),
            Value::from("DEFAULT"),
            Value::from("ORGANIZATION"),
            Value::from("tag1"),
        ]
    );
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let repo = tags();
    let client = ScriptedClient::new().affected(0);

    let err = repo.update(&client, &tag("missing", "x")).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    assert_eq!(client.statements().len(), 1);
}

#[tokio::test]
async fn update_by_key_addresses_the_given_key() {
    let repo = tags();
    let moved = tag("tag2", "Moved");
    let client = ScriptedClient::new().affected(1).rows(vec![tag_row(&moved)]);

    repo.update_by_key(&client, &moved, &"tag1".to_string())
        .await
        .unwrap();
    assert_eq!(client.params(0).last(), Some(&Value::from("tag1")));
    assert_eq!(client.params(1), vec![Value::from("tag1")]);
}

#[tokio::test]
async fn update_without_entity_is_invalid_argument() {
    let client = ScriptedClient::new();
    let err = tags().update_opt(&client, None).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(client.statements().is_empty());
}

#[tokio::test]
async fn deleting_a_missing_key_is_a_no_op() {
    let repo = tags();
    let client = ScriptedClient::new().affected(0).affected(0);

    assert_eq!(repo.delete(&client, &"nope".to_string()).await.unwrap(), 0);
    assert_eq!(repo.delete(&client, &"nope".to_string()).await.unwrap(), 0);
}

#[tokio::test]
async fn exists_counts_by_key() {
    let client = ScriptedClient::new().rows(vec![Record::from_pairs([(
        "count",
        Value::BigInt(1),
    )])]);

    assert!(tags().exists(&client, &"tag1".to_string()).await.unwrap());
    assert_eq!(
        client.statements(),
        vec!["SELECT COUNT(*) FROM tags WHERE id = $1"]
    );
}

#[tokio::test]
async fn find_by_ids_with_no_ids_issues_no_query() {
    let client = ScriptedClient::new();
    let found = tags().find_by_ids(&client, &[]).await.unwrap();
    assert!(found.is_empty());
    assert!(client.statements().is_empty());
}

#[tokio::test]
async fn find_by_ids_uses_in_list() {
    let client = ScriptedClient::new().rows(vec![tag_row(&tag("a", "A")), tag_row(&tag("b", "B"))]);
    let found = tags()
        .find_by_ids(&client, &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(
        client.statements(),
        vec!["SELECT id, name, reference_id, reference_type FROM tags WHERE id IN ($1, $2)"]
    );
}

// ============================================
// Composite keys
// ============================================

#[derive(Debug, Default, Clone, PartialEq)]
struct Membership {
    group_id: String,
    member_id: String,
    role: String,
}

fn memberships() -> Repository<Membership, (String, String)> {
    let binding = EntityBinding::<Membership>::builder("memberships", &["group_id", "member_id"])
        .column(
            "group_id",
            SqlType::Text,
            |m: &Membership| m.group_id.clone(),
            |m, v| m.group_id = v,
        )
        .column(
            "member_id",
            SqlType::Text,
            |m: &Membership| m.member_id.clone(),
            |m, v| m.member_id = v,
        )
        .column("role", SqlType::Text, |m: &Membership| m.role.clone(), |m, v| m.role = v)
        .build()
        .unwrap();
    Repository::new(Arc::new(binding))
}

#[tokio::test]
async fn composite_find_by_ids_uses_tuple_in() {
    let client = ScriptedClient::new().rows(vec![]);
    memberships()
        .find_by_ids(
            &client,
            &[
                ("g1".to_string(), "u1".to_string()),
                ("g1".to_string(), "u2".to_string()),
            ],
        )
        .await
        .unwrap();
    assert_eq!(
        client.statements(),
        vec![
            "SELECT group_id, member_id, role FROM memberships \
             WHERE (group_id, member_id) IN (($1, $2), ($3, $4))"
        ]
    );
}

#[tokio::test]
async fn composite_delete_binds_key_in_order() {
    let client = ScriptedClient::new().affected(1);
    memberships()
        .delete(&client, &("g1".to_string(), "u1".to_string()))
        .await
        .unwrap();
    assert_eq!(
        client.statements(),
        vec!["DELETE FROM memberships WHERE group_id = $1 AND member_id = $2"]
    );
    assert_eq!(client.params(0), vec![Value::from("g1"), Value::from("u1")]);
}

// ============================================
// Associations
// ============================================

#[tokio::test]
async fn create_inserts_parent_then_children_then_rereads() {
    let repo = apis();
    let api = Api {
        id: "api1".into(),
        name: "Orders".into(),
        tags: vec!["public".into(), "beta".into()],
    };
    let client = ScriptedClient::new()
        .affected(1)
        .affected(1)
        .affected(1)
        .rows(vec![
            api_row("api1", "Orders", Some("public")),
            api_row("api1", "Orders", Some("beta")),
        ]);

    let created = repo.create(&client, &api).await.unwrap();
    assert_eq!(created, api);
    assert_eq!(
        client.statements(),
        vec![
            "INSERT INTO apis (id, name) VALUES ($1, $2)",
            "INSERT INTO api_tags (api_id, tag) VALUES ($1, $2)",
            "INSERT INTO api_tags (api_id, tag) VALUES ($1, $2)",
            API_BY_ID,
        ]
    );
    assert_eq!(client.params(2), vec![Value::from("api1"), Value::from("beta")]);
}

#[tokio::test]
async fn update_replaces_children() {
    let repo = apis();
    let api = Api {
        id: "api1".into(),
        name: "Orders v2".into(),
        tags: vec!["internal".into()],
    };
    let client = ScriptedClient::new()
        .affected(1)
        .affected(2)
        .affected(1)
        .rows(vec![api_row("api1", "Orders v2", Some("internal"))]);

    let updated = repo.update(&client, &api).await.unwrap();
    assert_eq!(updated.tags, vec!["internal"]);
    assert_eq!(
        client.statements(),
        vec![
            "UPDATE apis SET name = $1 WHERE id = $2",
            "DELETE FROM api_tags WHERE api_id = $1",
            "INSERT INTO api_tags (api_id, tag) VALUES ($1, $2)",
            API_BY_ID,
        ]
    );
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Link {
    group_id: String,
    member_id: String,
    scopes: Vec<String>,
}

fn links() -> Repository<Link, (String, String)> {
    let binding = EntityBinding::<Link>::builder("links", &["group_id", "member_id"])
        .column(
            "group_id",
            SqlType::Text,
            |l: &Link| l.group_id.clone(),
            |l, v| l.group_id = v,
        )
        .column(
            "member_id",
            SqlType::Text,
            |l: &Link| l.member_id.clone(),
            |l, v| l.member_id = v,
        )
        .build()
        .unwrap();
    let scopes = Association::new(
        "link_scopes",
        &["group_id", "member_id"],
        &["scope"],
        |l: &Link| l.scopes.iter().map(|s| vec![Value::from(s)]).collect(),
        |l: &mut Link, row: &Record| {
            l.scopes.push(row.get_as("scope")?);
            Ok(())
        },
    )
    .unwrap();
    Repository::new(Arc::new(binding))
        .with_association(scopes)
        .unwrap()
}

#[tokio::test]
async fn moving_a_key_only_row_replaces_children_under_the_old_key() {
    let moved = Link {
        group_id: "g2".into(),
        member_id: "u1".into(),
        scopes: vec!["read".into()],
    };
    let client = ScriptedClient::new()
        .affected(1)
        .affected(1)
        .affected(1)
        .rows(vec![Record::from_pairs([
            ("group_id", Value::from("g2")),
            ("member_id", Value::from("u1")),
            ("a0.group_id", Value::from("g2")),
            ("a0.member_id", Value::from("u1")),
            ("a0.scope", Value::from("read")),
        ])]);

    let updated = links()
        .update_by_key(&client, &moved, &("g1".to_string(), "u1".to_string()))
        .await
        .unwrap();
    assert_eq!(updated, moved);
    assert_eq!(
        client.statements(),
        vec![
            "UPDATE links SET group_id = $1, member_id = $2 WHERE group_id = $3 AND member_id = $4",
            "DELETE FROM link_scopes WHERE group_id = $1 AND member_id = $2",
            "INSERT INTO link_scopes (group_id, member_id, scope) VALUES ($1, $2, $3)",
            "SELECT p.group_id, p.member_id, a0.group_id AS \"a0.group_id\", \
             a0.member_id AS \"a0.member_id\", a0.scope AS \"a0.scope\" \
             FROM (SELECT group_id, member_id FROM links WHERE group_id = $1 AND member_id = $2) p \
             LEFT JOIN link_scopes a0 ON a0.group_id = p.group_id AND a0.member_id = p.member_id",
        ]
    );
    assert_eq!(client.params(1), vec![Value::from("g1"), Value::from("u1")]);
    assert_eq!(
        client.params(2),
        vec![Value::from("g2"), Value::from("u1"), Value::from("read")]
    );
    assert_eq!(client.params(3), vec![Value::from("g2"), Value::from("u1")]);
}

#[tokio::test]
async fn update_miss_leaves_children_alone() {
    let repo = apis();
    let client = ScriptedClient::new().affected(0);
    let api = Api {
        id: "ghost".into(),
        name: "Ghost".into(),
        tags: vec!["x".into()],
    };

    assert!(repo.update(&client, &api).await.unwrap_err().is_not_found());
    assert_eq!(client.statements(), vec!["UPDATE apis SET name = $1 WHERE id = $2"]);
}

#[tokio::test]
async fn delete_removes_children_first() {
    let client = ScriptedClient::new().affected(2).affected(1);
    apis().delete(&client, &"api1".to_string()).await.unwrap();
    assert_eq!(
        client.statements(),
        vec![
            "DELETE FROM api_tags WHERE api_id = $1",
            "DELETE FROM apis WHERE id = $1",
        ]
    );
}

#[tokio::test]
async fn joined_rows_collate_into_one_entity_per_key() {
    let client = ScriptedClient::new().rows(vec![
        api_row("api1", "Orders", Some("public")),
        api_row("api2", "Billing", None),
        api_row("api1", "Orders", Some("beta")),
        api_row("api1", "Orders", Some("public")),
    ]);

    let all = apis().find_all(&client).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "api1");
    assert_eq!(all[0].tags, vec!["public", "beta", "public"]);
    assert_eq!(all[1].id, "api2");
    assert!(all[1].tags.is_empty());
}

#[tokio::test]
async fn repeated_children_of_a_single_association_survive_a_read() {
    let client = ScriptedClient::new().rows(vec![
        api_row("api1", "Orders", Some("a")),
        api_row("api1", "Orders", Some("a")),
    ]);

    let api = apis()
        .find_by_id(&client, &"api1".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(api.tags, vec!["a", "a"]);
}

#[tokio::test]
async fn association_arity_must_match_key() {
    let binding = EntityBinding::<Membership>::builder("memberships", &["group_id", "member_id"])
        .column(
            "group_id",
            SqlType::Text,
            |m: &Membership| m.group_id.clone(),
            |m, v| m.group_id = v,
        )
        .column(
            "member_id",
            SqlType::Text,
            |m: &Membership| m.member_id.clone(),
            |m, v| m.member_id = v,
        )
        .build()
        .unwrap();
    let notes = Association::<Membership>::new(
        "membership_notes",
        &["group_id"],
        &["note"],
        |_| Vec::new(),
        |_, _| Ok(()),
    )
    .unwrap();
    let err = Repository::<Membership, (String, String)>::new(Arc::new(binding))
        .with_association(notes)
        .unwrap_err();
    assert!(err.is_configuration());
}

// ============================================
// Paging and search
// ============================================

#[tokio::test]
async fn find_all_page_slices_in_memory() {
    let rows: Vec<Record> = (0..25)
        .map(|i| tag_row(&tag(&format!("tag{i:02}"), "t")))
        .collect();
    let client = ScriptedClient::new().rows(rows);

    let page = tags()
        .find_all_page(&client, Some(&PageRequest::new(1, 10)))
        .await
        .unwrap();
    assert_eq!(page.page_number, 1);
    assert_eq!(page.page_elements, 10);
    assert_eq!(page.total_elements, 25);
    assert_eq!(page.content[0].id, "tag10");
    assert_eq!(page.content[9].id, "tag19");
}

#[tokio::test]
async fn search_page_counts_then_fetches_window() {
    let client = ScriptedClient::new()
        .rows(vec![Record::from_pairs([("count", Value::BigInt(12))])])
        .rows(vec![tag_row(&tag("tag10", "k")), tag_row(&tag("tag11", "l"))]);

    let mut criteria = Predicates::new();
    criteria.and(Condition::eq("reference_type", "ORGANIZATION").unwrap());
    let page = tags()
        .search_page(
            &client,
            &criteria,
            Some(&Sortable::desc("name")),
            &PageRequest::new(1, 10),
        )
        .await
        .unwrap();

    assert_eq!(page.total_elements, 12);
    assert_eq!(page.page_elements, 2);
    assert_eq!(
        client.statements(),
        vec![
            "SELECT COUNT(*) FROM tags WHERE reference_type = $1",
            "SELECT id, name, reference_id, reference_type FROM tags \
             WHERE reference_type = $1 ORDER BY name DESC LIMIT $2 OFFSET $3",
        ]
    );
    assert_eq!(
        client.params(1),
        vec![Value::from("ORGANIZATION"), Value::BigInt(10), Value::BigInt(10)]
    );
}

#[tokio::test]
async fn search_page_windows_parents_before_joining_children() {
    let client = ScriptedClient::new()
        .rows(vec![Record::from_pairs([("count", Value::BigInt(11))])])
        .rows(vec![
            api_row("api10", "Zeta", Some("public")),
            api_row("api10", "Zeta", Some("beta")),
        ]);

    let page = apis()
        .search_page(
            &client,
            &Predicates::new(),
            Some(&Sortable::asc("name")),
            &PageRequest::new(1, 10),
        )
        .await
        .unwrap();

    assert_eq!(page.total_elements, 11);
    assert_eq!(page.page_elements, 1);
    assert_eq!(page.content[0].tags, vec!["public", "beta"]);
    assert_eq!(
        client.statements(),
        vec![
            "SELECT COUNT(*) FROM apis",
            "SELECT p.id, p.name, a0.api_id AS \"a0.api_id\", a0.tag AS \"a0.tag\" \
             FROM (SELECT id, name FROM apis ORDER BY name ASC LIMIT $1 OFFSET $2) p \
             LEFT JOIN api_tags a0 ON a0.api_id = p.id ORDER BY p.name ASC",
        ]
    );
    assert_eq!(client.params(1), vec![Value::BigInt(10), Value::BigInt(10)]);
}

#[tokio::test]
async fn search_sorts_case_insensitively() {
    let client = ScriptedClient::new().rows(vec![]);
    tags()
        .search(&client, &Predicates::new(), Some(&Sortable::asc("name").ignore_case()))
        .await
        .unwrap();
    assert_eq!(
        client.statements(),
        vec!["SELECT id, name, reference_id, reference_type FROM tags ORDER BY lower(name) ASC"]
    );
}

#[tokio::test]
async fn query_collated_folds_custom_joins() {
    let client = ScriptedClient::new().rows(vec![
        api_row("api1", "Orders", Some("public")),
        api_row("api1", "Orders", Some("beta")),
    ]);
    let query = relmap::sql(
        "SELECT a.id, a.name, t.api_id AS \"a0.api_id\", t.tag AS \"a0.tag\" \
         FROM apis a LEFT JOIN api_tags t ON t.api_id = a.id",
    );

    let apis = apis()
        .query_collated(&client, &query, &["id"], |api, row| {
            if let Some(tag) = row.get_as::<Option<String>>("a0.tag")? {
                api.tags.push(tag);
            }
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(apis.len(), 1);
    assert_eq!(apis[0].tags, vec!["public", "beta"]);
}

// ============================================
// Error taxonomy
// ============================================

#[tokio::test]
async fn execution_faults_are_wrapped_as_persistence() {
    let client = ScriptedClient::new().fail("connection reset");
    let err = tags()
        .find_by_id(&client, &"tag1".to_string())
        .await
        .unwrap_err();
    assert!(err.is_persistence(), "{err:?}");
    match err {
        OrmError::Persistence { context, source } => {
            assert_eq!(context, "find_by_id tags");
            assert!(matches!(*source, OrmError::Connection(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn wrong_key_arity_is_invalid_argument() {
    let binding = EntityBinding::<Tag>::builder("tags", &["id"])
        .column("id", SqlType::Text, |t: &Tag| t.id.clone(), |t, v| t.id = v)
        .build()
        .unwrap();
    let repo: Repository<Tag, (String, String)> = Repository::new(Arc::new(binding));
    let client = ScriptedClient::new();

    let err = repo
        .find_by_id(&client, &("a".to_string(), "b".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument(), "{err:?}");
    assert!(client.statements().is_empty());
}
