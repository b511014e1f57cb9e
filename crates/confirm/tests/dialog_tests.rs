use std::time::Duration;

use admin_console_confirm::{ConfirmDialog, DialogState};
use tokio::time::timeout;

#[tokio::test]
async fn test_confirm_resolves_true() {
    let dialog = ConfirmDialog::new();
    let handle = dialog.confirm("Delete user", "Delete alice?");

    assert_eq!(
        dialog.state(),
        DialogState {
            visible: true,
            title: "Delete user".to_string(),
            message: "Delete alice?".to_string(),
        }
    );

    dialog.on_confirm();
    assert!(handle.await);
    assert!(!dialog.is_open());
}

#[tokio::test]
async fn test_cancel_resolves_false() {
    let dialog = ConfirmDialog::new();
    let handle = dialog.confirm("Publish", "Publish the article?");

    let ui = dialog.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        ui.on_cancel();
    });

    assert!(!timeout(Duration::from_secs(1), handle).await.unwrap());
}

#[tokio::test]
async fn test_second_prompt_orphans_the_first() {
    let dialog = ConfirmDialog::new();
    let first = dialog.confirm("First", "one");
    let second = dialog.confirm("Second", "two");

    assert_eq!(dialog.state().title, "Second");

    dialog.on_confirm();
    assert!(second.await);
    assert!(timeout(Duration::from_millis(100), first).await.is_err());
}

#[tokio::test]
async fn test_subscribers_see_prompt_changes() {
    let dialog = ConfirmDialog::new();
    let mut rx = dialog.subscribe();

    let _handle = dialog.confirm("Logout", "Sign out now?");
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().visible);

    dialog.on_cancel();
    rx.changed().await.unwrap();
    assert!(!rx.borrow().visible);
}
