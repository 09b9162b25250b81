//! Interactive terminal surface.
//!
//! A thin read of session state: every loop iteration renders the current
//! question (or the round boundary) and turns one line of input into one
//! session command. All quiz semantics live in quizdrill-core.

use anyhow::Result;
use quizdrill_core::gateway::PersistenceGateway;
use quizdrill_core::grading::choice_letter;
use quizdrill_core::session::{Advance, Graded, RoundStart, Session, StartReport};
use quizdrill_core::types::{Question, QuizMode, Submission, TypeFilter};
use std::io::{self, BufRead, Write};

const HELP: &str = "\
answer with choice letters: a, or bc / b c for multi-select
  :next (:n)        next question
  :refresh          discard the round and draw a new one
  :mode errors      drill missed questions from the next round on
  :mode normal      back to mixed rounds
  :filter all|single|multi
  :book             wrong-answer book
  :master <id>      mark a question mastered from the book
  :clear            drop history of corrected mistakes
  :stats            progress counters
  :reset            wipe all progress (asks to confirm)
  :quit (:q)        leave";

/// Prompt until a non-blank user id is entered; blank input re-prompts
/// instead of starting (and failing) a session.
pub fn prompt_user_id() -> Result<String> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    match read_user_id(&mut lines)? {
        Some(user) => Ok(user),
        None => anyhow::bail!("no user id given"),
    }
}

fn read_user_id(lines: &mut impl Iterator<Item = io::Result<String>>) -> Result<Option<String>> {
    loop {
        print!("user id: ");
        io::stdout().flush()?;
        match lines.next() {
            Some(line) => {
                let line = line?;
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return Ok(Some(trimmed.to_string()));
                }
                println!("user id must not be blank");
            }
            None => return Ok(None),
        }
    }
}

pub fn run(mut session: Session<Box<dyn PersistenceGateway>>, report: StartReport) -> Result<()> {
    if let Some(warning) = &report.load_warning {
        tracing::warn!("{warning}");
    }
    if report.new_user {
        println!("welcome, {}! starting a fresh record.", session.user_id());
    } else {
        let stats = session.stats();
        println!(
            "welcome back, {}! {} mastered, {} missed outstanding.",
            session.user_id(),
            stats.mastered,
            stats.missed
        );
    }
    announce_round(&report.round);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let answered = match session.current_question() {
            Some(question) => {
                let (cursor, total) = session.progress();
                let answered = session.submitted_for(question.id).is_some();
                if !answered {
                    render_question(question, cursor, total);
                }
                answered
            }
            None => {
                println!("no questions match the current filter. try :filter all or :refresh");
                false
            }
        };

        if answered {
            print!("[enter = next] > ");
        } else {
            print!("> ");
        }
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = line.trim();

        if answered && input.is_empty() {
            advance(&mut session)?;
            continue;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix(':') {
            if !handle_command(&mut session, command, &mut lines)? {
                break;
            }
            continue;
        }

        match session.current_question() {
            Some(question) => match build_submission(question, input) {
                Ok(submission) => match session.submit_answer(submission) {
                    Ok(graded) => render_graded(&graded),
                    Err(e) => println!("{e}"),
                },
                Err(message) => println!("{message}"),
            },
            None => println!("nothing to answer. {HELP}"),
        }
    }

    Ok(())
}

/// Returns false when the user asked to quit.
fn handle_command(
    session: &mut Session<Box<dyn PersistenceGateway>>,
    command: &str,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<bool> {
    let mut parts = command.split_whitespace();
    match (parts.next().unwrap_or(""), parts.next()) {
        ("q", _) | ("quit", _) => return Ok(false),
        ("help", _) | ("h", _) => println!("{HELP}"),
        ("n", _) | ("next", _) => advance(session)?,
        ("refresh", _) => announce_round(&session.refresh_batch()),
        ("mode", Some("errors")) => {
            session.switch_mode(QuizMode::ErrorDrill);
            println!("error drill starts with the next round (:refresh to start now)");
        }
        ("mode", Some("normal")) => {
            session.switch_mode(QuizMode::Normal);
            println!("normal mode starts with the next round");
        }
        ("filter", Some(which)) => match parse_filter(which) {
            Some(filter) => announce_round(&session.set_type_filter(filter)),
            None => println!("usage: :filter all|single|multi"),
        },
        ("book", _) => render_book(session),
        ("master", Some(id)) => match id.parse() {
            Ok(id) => match session.mark_mastered(id) {
                Ok(save_error) => {
                    println!("question {id} marked mastered");
                    warn_on_save(save_error);
                }
                Err(e) => println!("{e}"),
            },
            Err(_) => println!("usage: :master <question id>"),
        },
        ("clear", _) => {
            let (removed, save_error) = session.clear_corrected();
            println!("cleared {removed} corrected mistakes");
            warn_on_save(save_error);
        }
        ("stats", _) => render_stats(session),
        ("reset", _) => {
            println!("this wipes all progress and cannot be undone. type yes to confirm:");
            print!("> ");
            io::stdout().flush()?;
            let confirmed = match lines.next() {
                Some(line) => line?.trim().eq_ignore_ascii_case("yes"),
                None => false,
            };
            if confirmed {
                let round = session.reset_progress();
                println!("all progress reset.");
                announce_round(&round);
            } else {
                println!("reset cancelled");
            }
        }
        _ => println!("unknown command. {HELP}"),
    }
    Ok(true)
}

fn advance(session: &mut Session<Box<dyn PersistenceGateway>>) -> Result<()> {
    match session.advance() {
        Ok(Advance::Next) => {}
        Ok(Advance::RoundComplete(round)) => {
            println!("round complete!");
            announce_round(&round);
        }
        Err(e) => println!("{e}"),
    }
    Ok(())
}

fn render_question(question: &Question, cursor: usize, total: usize) {
    println!();
    println!("[{}/{}] #{} {}", cursor + 1, total, question.id, question.text);
    if question.is_multi_select() {
        println!("(multi-select: pick every correct option)");
    }
    for option in &question.options {
        println!("  {option}");
    }
}

fn render_graded(graded: &Graded) {
    if graded.is_correct {
        println!("correct!");
    } else {
        println!("wrong. correct answer: {}", graded.correct_options.join(", "));
    }
    if let Some(explanation) = &graded.explanation {
        println!("explanation: {explanation}");
    }
    warn_on_save(graded.save_error.clone());
}

fn render_book(session: &Session<Box<dyn PersistenceGateway>>) {
    let entries = session.review_list();
    if entries.is_empty() {
        println!("no mistakes on record. keep it up!");
        return;
    }
    println!("wrong-answer book ({} entries):", entries.len());
    for entry in entries {
        let mark = if entry.corrected { "corrected" } else { "open" };
        println!(
            "  #{} missed {}x [{}] {}",
            entry.question.id, entry.miss_count, mark, entry.question.text
        );
        if let Some(last) = entry.last_wrong {
            match last {
                Submission::Single(text) => println!("      last answer: {text}"),
                Submission::Multiple(texts) => {
                    println!("      last answer: {}", texts.join(", "))
                }
            }
        }
    }
}

fn render_stats(session: &Session<Box<dyn PersistenceGateway>>) {
    let stats = session.stats();
    println!(
        "{} questions | {} mastered ({:.1}%) | {} missed | {} tracked mistakes (max {}x)",
        stats.total_questions,
        stats.mastered,
        stats.mastery_rate() * 100.0,
        stats.missed,
        stats.tracked_mistakes,
        stats.max_miss_count,
    );
}

fn warn_on_save(save_error: Option<String>) {
    if let Some(error) = save_error {
        tracing::warn!("progress not saved remotely, continuing locally: {error}");
    }
}

fn announce_round(round: &RoundStart) {
    if round.fell_back_to_normal {
        println!("no missed questions left to drill, back to normal rounds.");
    }
    let mode = match round.mode {
        QuizMode::Normal => "normal",
        QuizMode::ErrorDrill => "error drill",
    };
    println!(
        "new {} round: {} questions ({} missed, {} review, {} new)",
        mode, round.size, round.from_missed, round.from_review, round.from_unseen
    );
    warn_on_save(round.save_error.clone());
}

fn parse_filter(which: &str) -> Option<TypeFilter> {
    match which {
        "all" => Some(TypeFilter::All),
        "single" => Some(TypeFilter::SingleOnly),
        "multi" => Some(TypeFilter::MultiOnly),
        _ => None,
    }
}

/// Turn a line like "a", "bc" or "b c" into a submission for the question.
fn build_submission(question: &Question, input: &str) -> Result<Submission, String> {
    let mut letters = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        for c in token.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(format!("not a choice letter: {c}"));
            }
            letters.push(c.to_ascii_uppercase().to_string());
        }
    }

    let mut picked = Vec::new();
    for letter in &letters {
        match question
            .options
            .iter()
            .find(|opt| choice_letter(opt) == *letter)
        {
            Some(option) => picked.push(option.clone()),
            None => return Err(format!("no option {letter} on this question")),
        }
    }

    if question.is_multi_select() {
        Ok(Submission::Multiple(picked))
    } else if picked.len() == 1 {
        Ok(Submission::Single(picked.remove(0)))
    } else {
        Err("pick exactly one option".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizdrill_core::types::CorrectAnswer;

    fn single() -> Question {
        Question {
            id: 0,
            text: "capital?".into(),
            options: vec!["A. Paris".into(), "B. Lyon".into()],
            answer: CorrectAnswer::Single("A".into()),
            explanation: None,
        }
    }

    fn multi() -> Question {
        Question {
            id: 1,
            text: "pick".into(),
            options: vec!["A. x".into(), "B. y".into(), "C. z".into()],
            answer: CorrectAnswer::Multiple(["B".to_string(), "C".to_string()].into()),
            explanation: None,
        }
    }

    #[test]
    fn single_letter_maps_to_option_text() {
        let submission = build_submission(&single(), "a").unwrap();
        assert_eq!(submission, Submission::Single("A. Paris".into()));
    }

    #[test]
    fn multi_letters_in_any_shape() {
        let expected = Submission::Multiple(vec!["B. y".into(), "C. z".into()]);
        assert_eq!(build_submission(&multi(), "bc").unwrap(), expected);
        assert_eq!(build_submission(&multi(), "b c").unwrap(), expected);
        assert_eq!(build_submission(&multi(), "B,C").unwrap(), expected);
    }

    #[test]
    fn unknown_letters_are_rejected() {
        assert!(build_submission(&single(), "z").is_err());
        assert!(build_submission(&single(), "1").is_err());
    }

    #[test]
    fn single_select_needs_exactly_one_letter() {
        assert!(build_submission(&single(), "ab").is_err());
    }

    #[test]
    fn blank_user_ids_are_reprompted() {
        let mut lines = vec![
            Ok(String::new()),
            Ok("   ".to_string()),
            Ok(" ann ".to_string()),
        ]
        .into_iter();
        assert_eq!(read_user_id(&mut lines).unwrap(), Some("ann".to_string()));
    }

    #[test]
    fn exhausted_input_yields_no_user() {
        let mut lines = vec![Ok("  ".to_string())].into_iter();
        assert_eq!(read_user_id(&mut lines).unwrap(), None);
    }
}
