/*
 * The console event loop. User input is read on a dedicated thread and
 * delivered over a channel, so the loop can wait for input and still pick up
 * background results (a finished export) while the user is idle.
 */
use super::command_executor::ConsoleView;
use super::error::{ConsoleError, Result as ConsoleResult};
use super::input::parse_line;
use super::types::{AppEvent, MessageSeverity, UiCommand, UiEventHandler};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/*
 * Starts the thread that forwards stdin line by line. The channel disconnects
 * when stdin reaches end of input or fails.
 */
fn spawn_input_reader() -> ConsoleResult<Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("Console: Failed to read input: {e}");
                        break;
                    }
                }
            }
            log::debug!("Console: Input reader finished.");
        })
        .map_err(|e| ConsoleError::InputReaderFailed(e.to_string()))?;
    Ok(receiver)
}

// Executes `commands` in order; returns true once a `Quit` has been executed.
fn dispatch<W: Write>(
    view: &mut ConsoleView,
    out: &mut W,
    commands: &[UiCommand],
) -> ConsoleResult<bool> {
    let mut quit = false;
    for command in commands {
        view.execute_command(out, command)?;
        if *command == UiCommand::Quit {
            quit = true;
        }
    }
    Ok(quit)
}

/*
 * Runs a session until the user quits or input ends. Input ending behaves like
 * `quit`, so a running export still completes.
 */
pub fn run_session<H: UiEventHandler, W: Write>(
    handler: &mut H,
    input: &Receiver<String>,
    out: &mut W,
) -> ConsoleResult<()> {
    let mut view = ConsoleView::new();
    dispatch(&mut view, out, &handler.handle_event(AppEvent::Rescan))?;
    writeln!(out, "Type 'help' for a list of commands.")?;

    let mut show_prompt = true;
    loop {
        if show_prompt {
            write!(out, "{}", view.prompt())?;
            out.flush()?;
            show_prompt = false;
        }

        match input.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                show_prompt = true;
                match parse_line(&line) {
                    Ok(events) => {
                        for event in events {
                            let commands = handler.handle_event(event);
                            if dispatch(&mut view, out, &commands)? {
                                handler.on_quit();
                                return Ok(());
                            }
                        }
                    }
                    Err(e) => {
                        let message = UiCommand::ShowMessage {
                            severity: MessageSeverity::Warning,
                            text: e.to_string(),
                        };
                        view.execute_command(out, &message)?;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("Console: Input closed, quitting.");
                writeln!(out)?;
                if handler.is_busy() {
                    writeln!(out, "Waiting for the running export to finish...")?;
                }
                dispatch(&mut view, out, &handler.handle_event(AppEvent::Quit))?;
                handler.on_quit();
                return Ok(());
            }
        }

        let background = handler.poll_background_work();
        if !background.is_empty() {
            dispatch(&mut view, out, &background)?;
            show_prompt = true;
        }
    }
}

// Runs an interactive session on stdin and stdout.
pub fn run_console<H: UiEventHandler>(handler: &mut H) -> ConsoleResult<()> {
    let input = spawn_input_reader()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_session(handler, &input, &mut out)
}
