use crate::cli::HistoryCommand;
use crate::error::{ParleyError, Result};
use crate::storage::{Chat, ChatStore};
use chrono::Local;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands against the configured chat store
pub fn handle_history(store: &ChatStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { user } => {
            let mut chats = store.list(&user)?;

            if chats.is_empty() {
                println!("{}", format!("No chats found for {}.", user).yellow());
                return Ok(());
            }

            chats.sort_by(|a, b| {
                b.pinned
                    .cmp(&a.pinned)
                    .then_with(|| b.updated_at.cmp(&a.updated_at))
            });

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Name".bold(),
                "Pinned".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for chat in &chats {
                table.add_row(prettytable::row![
                    chat.id.cyan(),
                    short_name(&chat.name),
                    if chat.pinned { "yes" } else { "" },
                    chat.messages.len(),
                    updated_label(chat)
                ]);
            }

            println!("\nChats for {}:", user);
            table.printstd();
            println!();
        }
        HistoryCommand::Delete { user, chat_id } => {
            if !store.delete(&user, &chat_id)? {
                return Err(ParleyError::chat_not_found().into());
            }
            println!("{}", format!("Deleted chat {}", chat_id).green());
        }
        HistoryCommand::Clear { user } => {
            let removed = store.clear(&user)?;
            println!("{}", format!("Deleted {} chat(s) for {}", removed, user).green());
        }
    }

    Ok(())
}

fn short_name(name: &str) -> String {
    if name.chars().count() > 40 {
        let head: String = name.chars().take(37).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn updated_label(chat: &Chat) -> String {
    chat.updated_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_store;

    #[test]
    fn test_short_name_truncates_on_char_boundary() {
        assert_eq!(short_name("Trip"), "Trip");
        let long = "é".repeat(50);
        let short = short_name(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 40);
    }

    #[test]
    fn test_delete_missing_chat_fails() {
        let (_dir, store) = temp_store();
        let result = handle_history(
            &store,
            HistoryCommand::Delete {
                user: "alice".to_string(),
                chat_id: "nope".to_string(),
            },
        );
        crate::test_utils::assert_error_contains(result, "Chat not found");
    }

    #[test]
    fn test_clear_removes_only_owner_chats() {
        let (_dir, store) = temp_store();
        store.save(&Chat::new("alice")).unwrap();
        store.save(&Chat::new("alice")).unwrap();
        store.save(&Chat::new("bob")).unwrap();

        handle_history(
            &store,
            HistoryCommand::Clear {
                user: "alice".to_string(),
            },
        )
        .unwrap();

        assert!(store.list("alice").unwrap().is_empty());
        assert_eq!(store.list("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_list_empty_is_ok() {
        let (_dir, store) = temp_store();
        handle_history(
            &store,
            HistoryCommand::List {
                user: "alice".to_string(),
            },
        )
        .unwrap();
    }
}
