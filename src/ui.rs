use super::balance::format_balance;
use super::state::Snapshot;
use super::storage::PendingAllowance;
use super::types::{Balance, Comment, Post, SigningIdentity};
use anyhow::{anyhow, bail};
use std::fmt::Write;

/// User intent, the textual counterpart of a button press or form submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Feed,
    Balance,
    Post {
        image: String,
        title: String,
        description: String,
    },
    Comment {
        index: u64,
        description: String,
    },
    Like {
        index: u64,
    },
    /// `amount` exactly as typed, in cUSD
    Tip {
        index: u64,
        amount: String,
    },
    Allowances,
    Revoke,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  feed                                  show all posts
  balance                               show cUSD balance
  post <image> | <title> | <description> publish a post
  comment <index> <text>                comment on a post
  like <index>                          like a post
  tip <index> <amount>                  tip the author in cUSD
  allowances                            show allowance left by a failed tip
  revoke                                cancel that allowance
  help                                  show this text
  quit                                  leave";

fn parse_index(word: Option<&str>) -> anyhow::Result<u64> {
    let word = word.ok_or_else(|| anyhow!("missing post index"))?;
    word.parse()
        .map_err(|_| anyhow!("invalid post index '{}'", word))
}

pub fn parse_command(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "feed" => Command::Feed,
        "balance" => Command::Balance,
        "post" => {
            let fields: Vec<&str> = rest.splitn(3, '|').map(str::trim).collect();
            match fields.as_slice() {
                [image, title, description] if !image.is_empty() && !title.is_empty() => {
                    Command::Post {
                        image: image.to_string(),
                        title: title.to_string(),
                        description: description.to_string(),
                    }
                }
                _ => bail!("usage: post <image> | <title> | <description>"),
            }
        }
        "comment" => {
            let (index, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let index = parse_index(Some(index).filter(|i| !i.is_empty()))?;
            if text.trim().is_empty() {
                bail!("usage: comment <index> <text>");
            }
            Command::Comment {
                index,
                description: text.trim().to_string(),
            }
        }
        "like" => Command::Like {
            index: parse_index(rest.split_whitespace().next())?,
        },
        "tip" => {
            let mut words = rest.split_whitespace();
            let index = parse_index(words.next())?;
            let amount = words
                .next()
                .ok_or_else(|| anyhow!("usage: tip <index> <amount>"))?;
            Command::Tip {
                index,
                amount: amount.to_string(),
            }
        }
        "allowances" => Command::Allowances,
        "revoke" => Command::Revoke,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "" => bail!("empty command"),
        other => bail!("unknown command '{}', try 'help'", other),
    };
    Ok(command)
}

/// Comments are only shown to the author of the post.
pub fn visible_comments<'a>(post: &'a Post, viewer: Option<&SigningIdentity>) -> &'a [Comment] {
    match viewer {
        Some(viewer) if *viewer == post.author => post.comments.as_slice(),
        _ => &[],
    }
}

pub fn render_home(balance: &Balance) -> String {
    format!("Celogram  |  balance: {} cUSD", balance)
}

pub fn render_post(post: &Post, viewer: Option<&SigningIdentity>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{} ID] [{} Likes]", post.index, post.likes);
    let _ = writeln!(out, "  {}", post.title);
    let _ = writeln!(out, "  {}", post.description);
    let _ = writeln!(out, "  image: {}", post.image);
    let _ = writeln!(out, "  by {:?}", post.author);
    let _ = writeln!(out, "  Comments");
    for comment in visible_comments(post, viewer) {
        let _ = writeln!(out, "    - {}", comment.description);
    }
    out
}

pub fn render_feed(snapshot: &Snapshot) -> String {
    if snapshot.feed.is_empty() {
        return "no posts yet\n".to_string();
    }
    snapshot
        .feed
        .iter()
        .map(|post| render_post(post, snapshot.identity.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Feed as JSON, with comments filtered the same way as the text view.
pub fn render_feed_json(snapshot: &Snapshot) -> anyhow::Result<String> {
    let visible: Vec<Post> = snapshot
        .feed
        .iter()
        .map(|post| Post {
            comments: visible_comments(post, snapshot.identity.as_ref()).to_vec(),
            ..post.clone()
        })
        .collect();
    Ok(serde_json::to_string_pretty(&visible)?)
}

pub fn render_allowance(allowance: Option<&PendingAllowance>) -> String {
    match allowance {
        Some(a) => format!(
            "pending allowance of {} cUSD to {:?} from a failed tip on post {} ({:?})",
            format_balance(a.amount),
            a.spender,
            a.post_index,
            a.stage
        ),
        None => "no pending allowance".to_string(),
    }
}
