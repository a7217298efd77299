use clipper_core::player::Command;
use clipper_core::types::Seconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
n  next clip          p  previous clip
r  toggle random      ?  player status
s  open settings      d <secs>  set default duration
c  close settings     i / I  open / close description
h  help               q  quit";

/// Parse one line typed by the user.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(key) = words.next() else {
        return Err("empty input".into());
    };
    let input = match key {
        "n" => Input::Command(Command::Next),
        "p" => Input::Command(Command::Previous),
        "r" => Input::Command(Command::ToggleRandom),
        "s" => Input::Command(Command::OpenSettings),
        "c" => Input::Command(Command::CloseSettings),
        "i" => Input::Command(Command::OpenDescription),
        "I" => Input::Command(Command::CloseDescription),
        "d" => {
            let secs = words
                .next()
                .ok_or("d needs a number of seconds")?
                .parse::<u32>()
                .map_err(|e| format!("bad duration: {}", e))?;
            Input::Command(Command::SetDefaultDuration(Seconds(secs)))
        }
        "?" => Input::Status,
        "h" => Input::Help,
        "q" => Input::Quit,
        other => return Err(format!("unknown key {:?} (h for help)", other)),
    };
    if words.next().is_some() {
        return Err(format!("too many arguments for {}", key));
    }
    Ok(input)
}
