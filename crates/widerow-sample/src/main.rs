use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use widerow_dao::{
    ConfigResource, CrudDao, DEFAULT_RESOURCE, DaoError, NoopAuthenticator, SessionManager,
    SessionSettings,
};
use widerow_model::SchemaRegistry;
use widerow_sample::{Message, TABLE};
use widerow_store::{MemoryConnector, MemoryStore};

fn main() {
    tracing_subscriber::fmt::init();

    // Configuration directory: first argument, else $WIDEROW_CONF_DIR, else cwd.
    let resource = match std::env::args().nth(1) {
        Some(dir) => ConfigResource::new(DEFAULT_RESOURCE, vec![PathBuf::from(dir)]),
        None => ConfigResource::from_env(),
    };

    let store = Arc::new(MemoryStore::new());
    store.create_table(TABLE);

    let session = Arc::new(SessionManager::new(
        SessionSettings::new(resource),
        Arc::new(MemoryConnector::new(Arc::clone(&store))),
        Arc::new(NoopAuthenticator),
    ));
    let registry = Arc::new(SchemaRegistry::new());

    let dao = CrudDao::<Message>::new(Arc::clone(&session), registry).unwrap_or_else(|e| {
        eprintln!("failed to start: {e}");
        std::process::exit(1);
    });

    if let Err(e) = run(&dao) {
        error!(error = %e, "demo failed");
        session.shutdown();
        std::process::exit(1);
    }
    info!(rows = ?store.row_count(TABLE), "demo finished");
    session.shutdown();
}

fn run(dao: &CrudDao<Message>) -> Result<(), DaoError> {
    let msg = Message::key(1, 2, 123456)
        .with_body("hello")
        .with_extra("key1", "value1");
    info!(ok = dao.put(Some(&msg))?, "put");

    let mut found = Message::key(1, 2, 123456);
    let ok = dao.get(Some(&mut found))?;
    info!(ok, body = ?found.body, extra = ?found.extra, "get");

    info!(ok = dao.delete(Some(&Message::key(1, 2, 123456)))?, "delete");
    let mut gone = Message::key(1, 2, 123456);
    info!(ok = dao.get(Some(&mut gone))?, "get after delete");

    let batch: Vec<Message> = (0..10)
        .map(|i| Message::key(1, 2, 1000 + i).with_body(format!("message {i}")))
        .collect();
    info!(results = ?dao.batch_put(Some(batch.as_slice()))?, "batch put");

    let scan = Message::scan(1, 2, 1002, 1006);
    for message in dao.scan(Some(&scan))? {
        info!(timestamp = ?message.timestamp, body = ?message.body, "scanned");
    }
    info!(count = dao.count(Some(&scan))?, "count");

    info!(results = ?dao.batch_delete(Some(batch.as_slice()))?, "batch delete");
    Ok(())
}
