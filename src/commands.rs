use alert_core::AccelerationSample;

use crate::error::CommandError;

#[derive(Clone, PartialEq, Debug)]
pub enum UiCommand {
    StartTracking,
    StopTracking,
    ToggleTracking,
    Cancel,
    SendNow,
    SetThreshold(f64),
    AddContact(String),
    RemoveContact(usize),
    ListContacts,
    Status,
    Help,
    Quit,
}

/// One line of console input.
#[derive(Clone, PartialEq, Debug)]
pub enum Input {
    /// New simulated accelerometer reading; goes to the sensor, not the app.
    Reading(AccelerationSample),
    Command(UiCommand),
}

fn parse_f64(command: &'static str, word: Option<&str>) -> Result<f64, CommandError> {
    let word = word.ok_or_else(|| CommandError::BadArgument {
        command,
        reason: "missing number".into(),
    })?;
    word.parse::<f64>().map_err(|_| CommandError::BadArgument {
        command,
        reason: format!("{:?} is not a number", word),
    })
}

/// Parse a console line. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Result<Option<Input>, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((v, r)) => (v, r.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "accel" => {
            let x = parse_f64("accel", args.next())?;
            let y = parse_f64("accel", args.next())?;
            let z = parse_f64("accel", args.next())?;
            return Ok(Some(Input::Reading(AccelerationSample::new(x, y, z))));
        }
        "start" | "on" => UiCommand::StartTracking,
        "stop" | "off" => UiCommand::StopTracking,
        "toggle" => UiCommand::ToggleTracking,
        "cancel" => UiCommand::Cancel,
        "sos" | "send" => UiCommand::SendNow,
        "threshold" => UiCommand::SetThreshold(parse_f64("threshold", args.next())?),
        "add" => UiCommand::AddContact(rest.to_owned()),
        "remove" | "rm" => {
            let word = args.next().unwrap_or("");
            let index = word.parse::<usize>().map_err(|_| CommandError::BadArgument {
                command: "remove",
                reason: format!("{:?} is not a contact number", word),
            })?;
            UiCommand::RemoveContact(index)
        }
        "contacts" | "list" => UiCommand::ListContacts,
        "status" => UiCommand::Status,
        "help" | "?" => UiCommand::Help,
        "quit" | "exit" => UiCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(Input::Command(command)))
}
