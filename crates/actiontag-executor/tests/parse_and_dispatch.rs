//! Parse model output and dispatch it through a handler table.

use std::sync::{Arc, Mutex};

use actiontag_core::error::ActionError;
use actiontag_core::types::{BashAction, ReadAction, WriteAction};
use actiontag_executor::{execute_actions, ActionHandlers};
use actiontag_parser::ActionParser;

fn reader() -> ActionHandlers {
    ActionHandlers::new().on_read(|a: ReadAction| async move { Ok(format!("read {}", a.path)) })
}

#[tokio::test]
async fn test_two_reads_one_at_a_time() {
    let actions = ActionParser::with_defaults()
        .parse(r#"<read path="/file1.ts"/><read path="/file2.ts"/>"#);
    assert_eq!(actions.len(), 2);

    let results = execute_actions(&actions, &reader(), true).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action, "Read /file1.ts");
    assert!(results[0].success);
}

#[tokio::test]
async fn test_two_reads_batch() {
    let actions = ActionParser::with_defaults()
        .parse(r#"<read path="/file1.ts"/><read path="/file2.ts"/>"#);
    let results = execute_actions(&actions, &reader(), false).await;
    let outputs: Vec<_> = results.iter().map(|r| r.result.as_str()).collect();
    assert_eq!(outputs, vec!["read /file1.ts", "read /file2.ts"]);
}

#[tokio::test]
async fn test_write_then_bash_observes_write() {
    let files: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let written = Arc::clone(&files);
    let listed = Arc::clone(&files);

    let handlers = ActionHandlers::new()
        .on_write(move |w: WriteAction| {
            let written = Arc::clone(&written);
            async move {
                written.lock().unwrap().push(w.path.clone());
                Ok(format!("wrote {} bytes", w.content.len()))
            }
        })
        .on_bash(move |b: BashAction| {
            let listed = Arc::clone(&listed);
            async move {
                if b.command != "ls" {
                    return Err(ActionError::Unavailable(b.command));
                }
                Ok(listed.lock().unwrap().join("\n"))
            }
        });

    let actions = ActionParser::with_defaults()
        .parse("<write path=\"a.txt\">hello</write>\n<bash>ls</bash>");
    let results = execute_actions(&actions, &handlers, false).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].result, "wrote 5 bytes");
    assert_eq!(results[1].result, "a.txt");
}

#[tokio::test]
async fn test_unwired_capabilities_are_skipped() {
    let actions = ActionParser::with_defaults()
        .parse(r#"<say>looking</say><grep pattern="todo"/><read path="a"/>"#);
    assert_eq!(actions.len(), 3);
    let results = execute_actions(&actions, &reader(), false).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action, "Read a");
}
