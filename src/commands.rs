/// Command palette entries and autocomplete logic

/// What a palette command does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
  Home,
  Search,
  Wishlist,
  SignIn,
  SignOut,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub id: CommandId,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    id: CommandId::Home,
    name: "home",
    aliases: &["h", "shop"],
    description: "Search box and recommendations",
  },
  Command {
    id: CommandId::Search,
    name: "search",
    aliases: &["s", "find"],
    description: "Full results page, e.g. :search whey",
  },
  Command {
    id: CommandId::Wishlist,
    name: "wishlist",
    aliases: &["w", "wl", "favorites"],
    description: "Saved products",
  },
  Command {
    id: CommandId::SignIn,
    name: "signin",
    aliases: &["login", "si"],
    description: "Sign in to your account",
  },
  Command {
    id: CommandId::SignOut,
    name: "signout",
    aliases: &["logout", "so"],
    description: "Sign out and forget the session",
  },
  Command {
    id: CommandId::Quit,
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit shelf",
  },
];

/// A resolved palette entry plus whatever followed the command word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub id: CommandId,
  pub argument: Option<String>,
}

/// Split `input` into command word and argument, resolving the word by name or alias.
pub fn parse(input: &str) -> Option<Invocation> {
  let input = input.trim();
  let (word, rest) = match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  };
  let word = word.to_lowercase();
  let command = COMMANDS
    .iter()
    .find(|c| c.name == word || c.aliases.contains(&word.as_str()))?;
  Some(Invocation {
    id: command.id,
    argument: (!rest.is_empty()).then(|| rest.to_string()),
  })
}

/// Get autocomplete suggestions for a given input
///
/// Only the command word is matched; an argument after it does not narrow
/// the list further.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let word = input.split_whitespace().next().unwrap_or("").to_lowercase();

  if word.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &word).map(|r| (cmd, r)))
    .collect();

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better: exact name, exact alias, prefix, then substring.
fn rank(cmd: &Command, word: &str) -> Option<u32> {
  if cmd.name == word {
    Some(0)
  } else if cmd.aliases.contains(&word) {
    Some(1)
  } else if cmd.name.starts_with(word) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(word)) {
    Some(3)
  } else if cmd.name.contains(word) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(word)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("wishlist");
    assert_eq!(suggestions[0].id, CommandId::Wishlist);
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("login");
    assert_eq!(suggestions[0].id, CommandId::SignIn);
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("sig");
    let names: Vec<_> = suggestions.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["signin", "signout"]);
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("list");
    assert_eq!(suggestions[0].id, CommandId::Wishlist);
  }

  #[test]
  fn test_argument_does_not_affect_suggestions() {
    let suggestions = get_suggestions("search whey protein");
    assert_eq!(suggestions[0].id, CommandId::Search);
  }

  #[test]
  fn test_parse_with_argument() {
    assert_eq!(
      parse("  s  vitamin c "),
      Some(Invocation {
        id: CommandId::Search,
        argument: Some("vitamin c".to_string()),
      })
    );
    assert_eq!(parse("QUIT").map(|i| i.id), Some(CommandId::Quit));
    assert_eq!(parse("nope"), None);
  }
}
