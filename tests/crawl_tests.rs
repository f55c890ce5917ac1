//! Integration tests for the crawl orchestrator
//!
//! These tests use wiremock to stand in for the upstream API and drive the
//! crawler end-to-end against an in-memory store.

use murmuration::api::{ApiClient, Credentials};
use murmuration::config::{ApiConfig, CrawlerConfig, ResolverConfig};
use murmuration::model::{Hashtag, User};
use murmuration::resolver::ResolverPool;
use murmuration::store::{GraphStore, SqliteStore};
use murmuration::{ApiError, Crawler, MurmurationError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_accounts(count: usize) -> Vec<Credentials> {
    (0..count)
        .map(|i| Credentials {
            name: format!("account-{i}"),
            consumer_key: format!("ck-{i}"),
            consumer_secret: format!("cs-{i}"),
            access_token: format!("at-{i}"),
            access_token_secret: format!("ats-{i}"),
        })
        .collect()
}

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_depth: 1,
        max_friends_to_load: 12_000,
        stale_after_days: 7,
        call_ceiling: 10_000,
    }
}

fn api_client(base_url: &str, accounts: usize) -> ApiClient {
    let api = ApiConfig {
        base_url: base_url.to_string(),
        reset_pad_secs: 0,
        cooldown_secs: 1,
    };
    ApiClient::new(&api, &crawler_config(), test_accounts(accounts))
        .expect("failed to build api client")
}

fn test_crawler(base_url: &str) -> Crawler<SqliteStore> {
    let store = SqliteStore::in_memory().expect("failed to open in-memory store");
    let resolver = ResolverPool::new(&ResolverConfig::default()).expect("failed to build resolver");
    Crawler::new(store, api_client(base_url, 1), resolver, &crawler_config())
}

fn wire_user(id: u64, screen_name: &str, friends: i64, followers: i64) -> serde_json::Value {
    json!({
        "id": id,
        "screen_name": screen_name,
        "name": format!("{screen_name} display"),
        "followers_count": followers,
        "friends_count": friends,
        "statuses_count": 10,
        "protected": false
    })
}

fn wire_tweet(id: u64, author: serde_json::Value, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user": author,
        "text": text,
        "lang": "en"
    })
}

async fn mount_empty_timeline_and_lists(server: &MockServer, user_id: u64) {
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", user_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    for list in ["/friends/list.json", "/followers/list.json"] {
        Mock::given(method("GET"))
            .and(path(list))
            .and(query_param("user_id", user_id.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
            )
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn follow_user_walks_one_hop_and_backfills_replies() {
    let server = MockServer::start().await;

    // seed lookup by screen name
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(1, "alice", 1, 0)])))
        .mount(&server)
        .await;

    // alice's timeline: one tweet replying to a tweet the store has never seen
    let mut reply = wire_tweet(100, wire_user(1, "alice", 1, 0), "answering dave");
    reply["in_reply_to_status_id"] = json!(50);
    reply["in_reply_to_user_id"] = json!(9);
    reply["in_reply_to_screen_name"] = json!("dave");
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reply])))
        .mount(&server)
        .await;

    // the missing reply target gets fetched exactly once
    Mock::given(method("GET"))
        .and(path("/statuses/lookup.json"))
        .and(query_param("id", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_tweet(
            50,
            wire_user(9, "dave", 0, 0),
            "the original"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    // alice follows bob, nobody follows alice
    Mock::given(method("GET"))
        .and(path("/friends/list.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"users": [wire_user(2, "bob", 0, 0)], "next_cursor": 0}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/followers/list.json"))
        .and(query_param("user_id", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
        )
        .mount(&server)
        .await;

    // bob at depth 1: refreshed but not expanded
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("user_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(2, "bob", 0, 0)])))
        .mount(&server)
        .await;
    mount_empty_timeline_and_lists(&server, 2).await;

    let mut crawler = test_crawler(&server.uri());
    crawler.follow_user("alice", 1).await.expect("crawl failed");

    // bob was reached through alice's friend list and fully refreshed
    let bob = crawler
        .store()
        .get_user_by_screen_name("bob")
        .unwrap()
        .expect("bob not stored");
    assert_eq!(bob.name.as_deref(), Some("bob display"));

    let alice = crawler
        .store()
        .get_user_by_screen_name("alice")
        .unwrap()
        .unwrap();
    let friends = crawler.store().load_friends(&alice).unwrap();
    assert!(friends.contains(&User::stub(2, "")));

    // the reply target was backfilled, so nothing is left to hydrate
    assert!(crawler.store().get_empty_tweets().unwrap().is_empty());

    // a second run finds everything fresh and visited: no further calls
    let calls = crawler.calls_made();
    crawler.follow_user("alice", 1).await.expect("re-crawl failed");
    assert_eq!(crawler.calls_made(), calls);
}

#[tokio::test]
async fn known_reply_targets_are_not_refetched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(1, "alice", 0, 0)])))
        .mount(&server)
        .await;

    let mut reply = wire_tweet(100, wire_user(1, "alice", 0, 0), "answering dave");
    reply["in_reply_to_status_id"] = json!(50);
    reply["in_reply_to_user_id"] = json!(9);
    reply["in_reply_to_screen_name"] = json!("dave");
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reply])))
        .mount(&server)
        .await;

    for list in ["/friends/list.json", "/followers/list.json"] {
        Mock::given(method("GET"))
            .and(path(list))
            .and(query_param("user_id", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
            )
            .mount(&server)
            .await;
    }

    // id lookups must never be issued for a tweet the store already holds
    Mock::given(method("GET"))
        .and(path("/statuses/lookup.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut crawler = test_crawler(&server.uri());
    let known: Vec<murmuration::Tweet> = vec![serde_json::from_value::<
        murmuration::api::wire::WireStatus,
    >(wire_tweet(50, wire_user(9, "dave", 0, 0), "the original"))
    .unwrap()
    .into()];
    crawler.store_mut().upsert_tweets(&known).unwrap();

    crawler.follow_user("alice", 0).await.expect("crawl failed");
    assert!(crawler.store().get_empty_tweets().unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_seed_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut crawler = test_crawler(&server.uri());
    let result = crawler.follow_user("ghost", 1).await;
    assert!(matches!(
        result,
        Err(MurmurationError::Api(ApiError::UserNotReadable))
    ));
}

#[tokio::test]
async fn unreadable_neighbor_is_skipped_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(1, "alice", 1, 0)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/friends/list.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"users": [wire_user(2, "suspended", 0, 0)], "next_cursor": 0}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/followers/list.json"))
        .and(query_param("user_id", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
        )
        .mount(&server)
        .await;

    // the upstream rejects every request about the neighbor
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("user_id", "2"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut crawler = test_crawler(&server.uri());
    crawler.follow_user("alice", 1).await.expect("crawl failed");

    // the neighbor survives as the stub written with the follow edge
    let stub = crawler.store().get_user(2).unwrap().expect("stub missing");
    assert_eq!(stub.screen_name, "suspended");
    assert!(stub.name.is_none());
    assert!(stub.protected);
}

#[tokio::test]
async fn leaf_users_do_not_spend_relationship_calls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(1, "alice", 3, 4)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    // a user that will not be expanded must not burn list quota
    for list in ["/friends/list.json", "/followers/list.json"] {
        Mock::given(method("GET"))
            .and(path(list))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
            )
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut crawler = test_crawler(&server.uri());
    crawler.follow_user("alice", 0).await.expect("crawl failed");
}

#[tokio::test]
async fn user_first_seen_as_leaf_is_still_expanded_later() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(2, "bob", 1, 0)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/friends/list.json"))
        .and(query_param("user_id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"users": [wire_user(3, "carol", 0, 0)], "next_cursor": 0}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/followers/list.json"))
        .and(query_param("user_id", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"users": [], "next_cursor": 0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("user_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(3, "carol", 0, 0)])))
        .mount(&server)
        .await;
    mount_empty_timeline_and_lists(&server, 3).await;

    let mut crawler = test_crawler(&server.uri());

    // bob is first reached as a leaf: refreshed, no expansion
    crawler.follow_user("bob", 0).await.expect("leaf pass failed");

    // reaching him again within the depth bound must still expand him
    crawler.follow_user("bob", 1).await.expect("expansion pass failed");

    let bob = crawler.store().get_user(2).unwrap().unwrap();
    let friends = crawler.store().load_friends(&bob).unwrap();
    assert!(friends.contains(&User::stub(3, "")));

    let carol = crawler.store().get_user(3).unwrap().expect("carol not stored");
    assert_eq!(carol.name.as_deref(), Some("carol display"));
}

#[tokio::test]
async fn protected_timeline_marks_the_user_and_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(1, "alice", 0, 0)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(query_param("user_id", "1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = test_crawler(&server.uri());
    crawler.follow_user("alice", 0).await.expect("crawl failed");

    let alice = crawler.store().get_user(1).unwrap().unwrap();
    assert!(alice.protected);
    assert!(alice.tweets_last_scanned.is_some());

    // the protected record short-circuits the next pass entirely
    let calls = crawler.calls_made();
    crawler.follow_user("alice", 0).await.expect("re-crawl failed");
    assert_eq!(crawler.calls_made(), calls);
}

#[tokio::test]
async fn hashtag_walk_persists_tag_tweets_and_posters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/tweets.json"))
        .and(query_param("q", "#rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [{
                "id": 70,
                "user": wire_user(5, "carol", 0, 0),
                "text": "shipping some #Rust today",
                "lang": "en",
                "entities": {"hashtags": [{"text": "Rust"}]}
            }]
        })))
        .mount(&server)
        .await;

    // carol is processed as a poster: refreshed, never expanded
    Mock::given(method("GET"))
        .and(path("/users/lookup.json"))
        .and(query_param("user_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_user(5, "carol", 0, 0)])))
        .mount(&server)
        .await;
    mount_empty_timeline_and_lists(&server, 5).await;

    let mut crawler = test_crawler(&server.uri());
    crawler
        .follow_hashtag("rust", 2)
        .await
        .expect("hashtag walk failed");

    let posters = crawler
        .store()
        .get_users_for_hashtag(&Hashtag::new("rust"))
        .unwrap();
    assert!(posters.contains(&User::stub(5, "")));

    let carol = crawler.store().get_user(5).unwrap().unwrap();
    assert_eq!(carol.name.as_deref(), Some("carol display"));
    assert_eq!(crawler.store().get_max_tweet_id(&carol).unwrap(), 70);
}

#[tokio::test]
async fn exhausted_account_rotates_to_the_next_one() {
    let server = MockServer::start().await;
    let reset_epoch = (chrono::Utc::now().timestamp() + 3600).to_string();

    // the first account's window is spent after one call
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(header("authorization", "Bearer at-0:ats-0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([wire_tweet(111, wire_user(1, "alice", 0, 0), "first")]))
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("x-rate-limit-reset", reset_epoch.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/statuses/user_timeline.json"))
        .and(header("authorization", "Bearer at-1:ats-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_tweet(
            999,
            wire_user(1, "alice", 0, 0),
            "second"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = api_client(&server.uri(), 2);
    let mut alice = User::stub(1, "alice");

    let first = client.fetch_timeline(&mut alice, -1).await.unwrap();
    assert!(first.iter().any(|t| t.id == 111));

    // the second call cannot use the spent account
    let second = client.fetch_timeline(&mut alice, -1).await.unwrap();
    assert!(second.iter().any(|t| t.id == 999));
}
