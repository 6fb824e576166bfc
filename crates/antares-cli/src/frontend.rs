//! GTP command dispatch over the engine operations

use antares_core::board::parse_cell;
use antares_core::{Cell, Endpoint, Engine, GameResult, GoalSpec, Player};

use crate::gtp::Request;

const COMMANDS: &[&str] = &[
    "boardsize",
    "clearboard",
    "eval",
    "genmove",
    "havannahwinner",
    "knowncommand",
    "komi",
    "listcommands",
    "listoptions",
    "name",
    "play",
    "playgame",
    "protocolversion",
    "putstones",
    "setoption",
    "showboard",
    "quit",
    "undo",
    "variant",
    "version",
];

const EDGE_TAGS: [&str; 6] = ["ne", "nwe", "swe", "se", "see", "nee"];
const CORNER_TAGS: [&str; 6] = ["nwc", "wc", "swc", "sec", "ec", "nec"];

/// What the main loop should do after a request.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit(String),
}

/// Command state: the engine plus whose turn it is and how the game ended.
pub struct Frontend {
    engine: Engine,
    player_to_move: Player,
    result: GameResult,
}

impl Default for Frontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend {
    pub fn new() -> Frontend {
        Frontend {
            engine: Engine::new(),
            player_to_move: Player::White,
            result: GameResult::NoneWon,
        }
    }

    /// Handles one parsed request and renders the reply.
    pub fn handle(&mut self, request: &Request) -> Outcome {
        let args = &request.args;
        let reply = match request.command.as_str() {
            "boardsize" => self.boardsize(args),
            "clearboard" => {
                self.engine.reset();
                self.result = GameResult::NoneWon;
                success(String::new())
            }
            "eval" => self.eval(args),
            "genmove" => self.genmove(args),
            "havannahwinner" => success(self.result.to_string()),
            "knowncommand" => success(
                args.first()
                    .map(|name| COMMANDS.contains(&name.as_str()))
                    .unwrap_or(false)
                    .to_string(),
            ),
            "komi" => success(String::new()),
            "listcommands" => success(format!("\n{}", COMMANDS.join("\n"))),
            "listoptions" => success(format!(
                "\nuse_lg_coordinates = {}\nseconds_per_move = {}",
                self.engine.use_lg_coordinates(),
                self.engine.seconds_per_move()
            )),
            "name" => success("Antares".to_owned()),
            "play" => self.play(args),
            "playgame" => self.playgame(args),
            "protocolversion" => success("2".to_owned()),
            "putstones" => self.putstones(args),
            "setoption" => self.setoption(args),
            "showboard" => success(format!("\n{}", self.engine.board_string())),
            "quit" => return Outcome::Quit(render(true, request.id, "")),
            "undo" => self.undo(),
            "variant" => self.variant(args),
            "version" => success(env!("CARGO_PKG_VERSION").to_owned()),
            unknown => failure(format!("unknown command {unknown}")),
        };
        match reply {
            Ok(text) => Outcome::Reply(render(true, request.id, &text)),
            Err(text) => Outcome::Reply(render(false, request.id, &text)),
        }
    }

    fn boardsize(&self, args: &[String]) -> Reply {
        let [size] = args else {
            return failure("expected one argument to boardsize".to_owned());
        };
        match size.parse::<usize>() {
            Ok(n) if n == antares_core::board::SIDE_LENGTH => success(String::new()),
            Ok(_) | Err(_) => failure(format!("unacceptable size {size}")),
        }
    }

    fn eval(&self, args: &[String]) -> Reply {
        match args {
            [] => success(self.engine.evaluation(self.player_to_move).to_string()),
            [color] => {
                let player = parse_color(color)?;
                success(format!("\n{}", self.engine.player_evaluation_string(player)))
            }
            [color, connection] => {
                let player = parse_color(color)?;
                let goal = parse_connection(connection)
                    .ok_or_else(|| format!("invalid connection {connection}"))?;
                success(format!(
                    "\n{}",
                    self.engine.partial_evaluation_string(player, &goal)
                ))
            }
            _ => failure("expected at most two arguments to eval".to_owned()),
        }
    }

    fn genmove(&mut self, args: &[String]) -> Reply {
        let mut player = self.player_to_move;
        let mut rest = args;
        if let Some(first) = args.first() {
            if let Ok(color) = parse_color(first) {
                player = color;
                rest = &args[1..];
            }
        }
        let seconds = match rest {
            [] => 0.0,
            [value] => value
                .parse::<f64>()
                .map_err(|_| format!("invalid double {value}"))?,
            _ => return failure("too many arguments to genmove".to_owned()),
        };
        if self.result != GameResult::NoneWon {
            return success("none".to_owned());
        }
        let reply = self.engine.suggest_move(player, seconds);
        if reply != "none" {
            self.result = self
                .engine
                .play_move(player, &reply)
                .map_err(|e| format!("unexpected move {reply}: {e}"))?;
            self.player_to_move = player.opponent();
        }
        success(reply)
    }

    fn play(&mut self, args: &[String]) -> Reply {
        let [color, text] = args else {
            return failure("expected two arguments to play".to_owned());
        };
        let player = parse_color(color)?;
        match self.engine.play_move(player, text) {
            Ok(result) => {
                self.result = result;
                self.player_to_move = player.opponent();
                success(String::new())
            }
            Err(_) => failure(format!("invalid move {text}")),
        }
    }

    fn playgame(&mut self, args: &[String]) -> Reply {
        let mut player = self.player_to_move;
        for (i, text) in args.iter().enumerate() {
            if self.engine.play_move(player, text).is_err() {
                for _ in 0..i {
                    self.engine.undo();
                }
                return failure(format!("invalid move {text}"));
            }
            player = player.opponent();
        }
        self.player_to_move = player;
        success(String::new())
    }

    fn putstones(&mut self, args: &[String]) -> Reply {
        let [color, moves @ ..] = args else {
            return failure("expected at least one argument to putstones".to_owned());
        };
        if moves.is_empty() {
            return failure("expected at least one argument to putstones".to_owned());
        }
        let player = parse_color(color)?;
        for (i, text) in moves.iter().enumerate() {
            if self.engine.play_move(player, text).is_err() {
                for _ in 0..i {
                    self.engine.undo();
                }
                return failure(format!("invalid move {text}"));
            }
        }
        success(String::new())
    }

    fn setoption(&mut self, args: &[String]) -> Reply {
        let [name, value] = args else {
            return failure("expected two arguments to set_option".to_owned());
        };
        match name.as_str() {
            "use_lg_coordinates" => {
                let flag = match value.as_str() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return failure(format!("invalid bool {value}")),
                };
                self.engine.set_use_lg_coordinates(flag);
                success(String::new())
            }
            "seconds_per_move" => {
                let seconds = value
                    .parse::<f64>()
                    .map_err(|_| format!("invalid double {value}"))?;
                self.engine.set_seconds_per_move(seconds);
                success(String::new())
            }
            _ => failure(format!("unknown option {name}")),
        }
    }

    fn undo(&mut self) -> Reply {
        if self.engine.undo() {
            self.player_to_move = self.player_to_move.opponent();
            self.result = GameResult::NoneWon;
            success(String::new())
        } else {
            failure("cannot undo".to_owned())
        }
    }

    fn variant(&self, args: &[String]) -> Reply {
        let mut cells: Vec<Cell> = Vec::with_capacity(args.len());
        for text in args {
            match parse_cell(text) {
                Some(cell) => cells.push(cell),
                None => return failure(format!("invalid move {text}")),
            }
        }
        if self.engine.dump_evaluations(&cells) {
            success(String::new())
        } else {
            failure("cannot execute moves".to_owned())
        }
    }
}

type Reply = Result<String, String>;

fn success(text: String) -> Reply {
    Ok(text)
}

fn failure(text: String) -> Reply {
    Err(text)
}

fn render(ok: bool, id: Option<i64>, text: &str) -> String {
    let sigil = if ok { '=' } else { '?' };
    let text = text.trim_end_matches('\n');
    match id {
        Some(id) => format!("{sigil}{id} {text}\n\n"),
        None => format!("{sigil} {text}\n\n"),
    }
}

fn parse_color(text: &str) -> Result<Player, String> {
    match text {
        "w" | "white" => Ok(Player::White),
        "b" | "black" => Ok(Player::Black),
        _ => Err(format!("invalid color {text}")),
    }
}

/// Parses an eval connection: a named goal, or `<endpoint>-<endpoint>` with
/// endpoints being cell names, edge tags or corner tags. A trailing
/// apostrophe ("with extra move") is accepted and ignored, as the original
/// front-end did.
fn parse_connection(text: &str) -> Option<GoalSpec> {
    let text = text.strip_suffix('\'').unwrap_or(text);
    match text {
        "ring" => return Some(GoalSpec::Ring),
        "bridge" => return Some(GoalSpec::Bridge),
        "fork" => return Some(GoalSpec::Fork),
        "total" => return Some(GoalSpec::Total),
        _ => {}
    }
    let (a, b) = text.split_once('-')?;
    Some(GoalSpec::Pair(parse_endpoint(a)?, parse_endpoint(b)?))
}

fn parse_endpoint(text: &str) -> Option<Endpoint> {
    if let Some(i) = EDGE_TAGS.iter().position(|&t| t == text) {
        return Endpoint::from_cell(Cell::edge_chain(i));
    }
    if let Some(i) = CORNER_TAGS.iter().position(|&t| t == text) {
        return Endpoint::from_cell(Cell::corner_chain(i));
    }
    parse_cell(text).map(Endpoint::Stone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtp::parse_line;

    fn reply_of(frontend: &mut Frontend, line: &str) -> String {
        match frontend.handle(&parse_line(line).unwrap()) {
            Outcome::Reply(text) | Outcome::Quit(text) => text,
        }
    }

    #[test]
    fn name_and_protocol() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "name"), "= Antares\n\n");
        assert_eq!(reply_of(&mut frontend, "protocol_version"), "= 2\n\n");
    }

    #[test]
    fn ids_are_echoed() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "7 name"), "=7 Antares\n\n");
        assert_eq!(
            reply_of(&mut frontend, "9 nonsense"),
            "?9 unknown command nonsense\n\n"
        );
    }

    #[test]
    fn known_command_checks_the_table() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "known_command genmove"), "= true\n\n");
        assert_eq!(reply_of(&mut frontend, "known_command frobnicate"), "= false\n\n");
    }

    #[test]
    fn play_accepts_and_rejects() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "play white c3"), "= \n\n");
        assert_eq!(
            reply_of(&mut frontend, "play black c3"),
            "? invalid move c3\n\n"
        );
    }

    #[test]
    fn boardsize_accepts_only_the_compiled_size() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "boardsize 8"), "= \n\n");
        assert_eq!(
            reply_of(&mut frontend, "boardsize 10"),
            "? unacceptable size 10\n\n"
        );
    }

    #[test]
    fn playgame_rolls_back_on_failure() {
        let mut frontend = Frontend::new();
        assert_eq!(
            reply_of(&mut frontend, "playgame c3 d4 c3"),
            "? invalid move c3\n\n"
        );
        assert_eq!(reply_of(&mut frontend, "showboard").matches('O').count(), 0);
        assert_eq!(reply_of(&mut frontend, "showboard").matches('X').count(), 0);
    }

    #[test]
    fn winner_is_tracked_through_play() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "havannah_winner"), "= none\n\n");
        for name in ["a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8"] {
            reply_of(&mut frontend, &format!("play white {name}"));
        }
        assert_eq!(reply_of(&mut frontend, "havannah_winner"), "= white\n\n");
        assert_eq!(reply_of(&mut frontend, "genmove white 1"), "= none\n\n");
    }

    #[test]
    fn connections_parse() {
        assert_eq!(parse_connection("ring"), Some(GoalSpec::Ring));
        assert_eq!(parse_connection("total'"), Some(GoalSpec::Total));
        assert_eq!(
            parse_connection("ne-nwc"),
            Some(GoalSpec::Pair(Endpoint::Edge(0), Endpoint::Corner(0)))
        );
        assert!(matches!(
            parse_connection("c3-se"),
            Some(GoalSpec::Pair(Endpoint::Stone(_), Endpoint::Edge(3)))
        ));
        assert_eq!(parse_connection("c3"), None);
        assert_eq!(parse_connection("zz-yy"), None);
    }

    #[test]
    fn options_round_trip() {
        let mut frontend = Frontend::new();
        assert_eq!(
            reply_of(&mut frontend, "set_option seconds_per_move 2.5"),
            "= \n\n"
        );
        let listing = reply_of(&mut frontend, "list_options");
        assert!(listing.contains("seconds_per_move = 2.5"));
        assert_eq!(
            reply_of(&mut frontend, "set_option frobs 3"),
            "? unknown option frobs\n\n"
        );
    }

    #[test]
    fn undo_flips_the_player_back() {
        let mut frontend = Frontend::new();
        assert_eq!(reply_of(&mut frontend, "undo"), "? cannot undo\n\n");
        reply_of(&mut frontend, "play white c3");
        assert_eq!(reply_of(&mut frontend, "undo"), "= \n\n");
    }
}
