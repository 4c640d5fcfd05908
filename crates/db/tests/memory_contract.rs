use hrbot_core::{Message, ThreadId, ToolCall};
use hrbot_db::repositories::{
    InMemoryConversationMemory, MongoConversationMemory, SqlConversationMemory,
};
use hrbot_db::{connect_mongo, connect_with_settings, migrations, ConversationMemory};
use serde_json::json;

fn tool_turn() -> Vec<Message> {
    let call = ToolCall {
        id: "toolu_01".to_string(),
        name: "employee_lookup".to_string(),
        arguments: json!({ "query": "rust engineers", "n": 3 }),
    };
    vec![
        Message::user("Who knows Rust?"),
        Message::assistant("", vec![call.clone()]),
        Message::tool_result(&call, "[]"),
        Message::assistant("Nobody matched.", Vec::new()),
    ]
}

async fn run_contract(memory: &dyn ConversationMemory) {
    let thread_id = ThreadId::generate();

    assert!(!memory.contains(&thread_id).await.expect("contains"));
    assert!(memory.load(&thread_id).await.expect("load unseen").is_empty());

    let first = tool_turn();
    memory.save(&thread_id, &first).await.expect("save first turn");
    assert!(memory.contains(&thread_id).await.expect("contains after save"));
    assert_eq!(memory.load(&thread_id).await.expect("load"), first);

    let mut second = first.clone();
    second.push(Message::user("And Go?"));
    second.push(Message::assistant("Still nobody.", Vec::new()));
    memory.save(&thread_id, &second).await.expect("save second turn");

    let reloaded = memory.load(&thread_id).await.expect("reload");
    assert_eq!(reloaded.len(), 6);
    assert_eq!(&reloaded[..first.len()], first.as_slice());

    let other = ThreadId::generate();
    assert!(memory.load(&other).await.expect("load other").is_empty());
}

#[tokio::test]
async fn in_memory_store_honours_contract() {
    run_contract(&InMemoryConversationMemory::default()).await;
}

#[tokio::test]
async fn postgres_store_honours_contract() {
    let Ok(url) = std::env::var("HRBOT_TEST_POSTGRES_URL") else {
        return;
    };
    let pool = connect_with_settings(&url, 2, 10).await.expect("pool should connect");
    migrations::run_pending(&pool).await.expect("migrations should apply");

    run_contract(&SqlConversationMemory::new(pool.clone())).await;
    pool.close().await;
}

#[tokio::test]
async fn mongo_store_honours_contract() {
    let Ok(uri) = std::env::var("HRBOT_TEST_MONGODB_URI") else {
        return;
    };
    let handle = connect_mongo(&uri, "hrbot_test", 10).await.expect("mongo should connect");

    run_contract(&MongoConversationMemory::new(&handle, "conversation_threads")).await;
    handle.close().await;
}
