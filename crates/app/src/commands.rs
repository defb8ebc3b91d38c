use std::io::Write;
use std::time::Instant;

use lexi_core::model::{
    ItemCorrection, ItemId, LearnAction, ReviewRating, SessionSummary, VocabularyDraft,
};
use services::{
    AppServices, CardView, LearnOutcome, RateOutcome, ReviewFilter, SessionError, SessionStart,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::config::{ArgsError, Config, NewItem};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Line-oriented reader over stdin for the interactive loops.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input.
    async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_owned()))
    }
}

pub async fn add(services: &AppServices, config: &Config, new: NewItem) -> CommandResult {
    let pair = config
        .pair
        .ok_or(ArgsError::MissingRequired { flag: "--pair" })?;
    let mut draft = VocabularyDraft::new(config.user_id, pair, new.text, new.translation);
    if let Some(example) = new.example {
        draft = draft.with_example(example);
    }
    if let Some(phonetic) = new.phonetic {
        draft = draft.with_phonetic(phonetic);
    }

    let item = services.vocabulary().add_item(draft).await?;
    println!("added #{} [{}] {} = {}", item.id, item.pair, item.text, item.translation);
    Ok(())
}

pub async fn correct(
    services: &AppServices,
    item_id: ItemId,
    correction: ItemCorrection,
) -> CommandResult {
    let item = services.vocabulary().correct_item(item_id, correction).await?;
    println!("updated #{} {} = {}", item.id, item.text, item.translation);
    Ok(())
}

pub async fn remove(services: &AppServices, item_id: ItemId) -> CommandResult {
    services.vocabulary().remove_item(item_id).await?;
    println!("removed #{item_id}");
    Ok(())
}

pub async fn list(services: &AppServices, config: &Config) -> CommandResult {
    let items = services
        .vocabulary()
        .list_items(config.user_id, config.pair)
        .await?;
    if items.is_empty() {
        println!("No words yet. Add one with `app add`.");
        return Ok(());
    }
    for item in items {
        let phonetic = item.phonetic.as_deref().unwrap_or("");
        println!(
            "#{:<5} [{}] {} {} = {}",
            item.id, item.pair, item.text, phonetic, item.translation
        );
    }
    Ok(())
}

pub async fn history(services: &AppServices, item_id: ItemId) -> CommandResult {
    let logs = services.vocabulary().history(item_id).await?;
    if logs.is_empty() {
        println!("#{item_id} has not been reviewed yet.");
        return Ok(());
    }
    for record in logs {
        let response = record
            .log
            .response_time_ms
            .map(|ms| format!(" in {:.1}s", f64::from(ms) / 1000.0))
            .unwrap_or_default();
        println!(
            "{}  quality {}{}",
            record.log.reviewed_at.format("%Y-%m-%d %H:%M"),
            record.log.quality.value(),
            response
        );
    }
    Ok(())
}

pub async fn stats(services: &AppServices, config: &Config) -> CommandResult {
    let stats = services.vocabulary().stats(config.user_id).await?;
    if stats.is_empty() {
        println!("No words yet. Add one with `app add`.");
        return Ok(());
    }
    println!("{:<8} {:>6} {:>8} {:>10} {:>5}", "pair", "total", "learned", "unlearned", "due");
    for row in stats.iter().filter(|row| config.pair.is_none_or(|p| p == row.pair)) {
        println!(
            "{:<8} {:>6} {:>8} {:>10} {:>5}",
            row.pair.to_string(),
            row.total,
            row.learned,
            row.unlearned(),
            row.due
        );
    }
    Ok(())
}

pub async fn due(services: &AppServices, config: &Config) -> CommandResult {
    let count = services
        .sessions()
        .count_due(config.user_id, config.pair)
        .await?;
    println!("{count} due for review");
    Ok(())
}

pub async fn learn(services: &AppServices, config: &Config, prompt: &mut Prompt) -> CommandResult {
    let learn = services.learn();
    let items = learn
        .unlearned_items(config.user_id, config.pair, config.learn_batch())
        .await?;
    if items.is_empty() {
        println!("No new words to learn.");
        return Ok(());
    }

    let mut learned = 0_u32;
    for item in items {
        println!();
        println!("[{}] {}", item.pair, item.text);
        if let Some(phonetic) = &item.phonetic {
            println!("    {phonetic}");
        }
        println!("  = {}", item.translation);
        if let Some(example) = &item.example {
            println!("    e.g. {example}");
        }

        let action = loop {
            let Some(answer) = prompt.ask("(k)now (h)ard (f)orgot (s)kip (q)uit> ").await? else {
                return finish_learn(learned);
            };
            match answer.as_str() {
                "k" => break Some(LearnAction::Know),
                "h" => break Some(LearnAction::Hard),
                "f" => break Some(LearnAction::Forgot),
                "s" => break None,
                "q" => return finish_learn(learned),
                other => match other.parse::<LearnAction>() {
                    Ok(action) => break Some(action),
                    Err(_) => println!("Please answer k, h, f, s or q."),
                },
            }
        };

        let Some(action) = action else { continue };
        match learn.apply(item.id, action).await? {
            LearnOutcome::Learned(state) => {
                learned += 1;
                println!("learned; first review {}", state.due_at().format("%Y-%m-%d %H:%M"));
            }
            LearnOutcome::Reviewed(persisted) => {
                println!(
                    "already learned; next review in {} day(s)",
                    persisted.state().interval_days()
                );
            }
            LearnOutcome::Skipped => println!("kept as new; it will come back next time"),
        }
    }

    finish_learn(learned)
}

fn finish_learn(learned: u32) -> CommandResult {
    println!();
    println!("{learned} word(s) learned");
    Ok(())
}

pub async fn review(services: &AppServices, config: &Config, prompt: &mut Prompt) -> CommandResult {
    let sessions = services.sessions();
    let mut filter = ReviewFilter::all().with_limit(config.review_limit());
    if let Some(pair) = config.pair {
        filter = filter.with_pair(pair);
    }

    let mut session = match sessions.start_session(config.user_id, filter).await? {
        SessionStart::Started(session) => session,
        SessionStart::Empty => {
            println!("Nothing is due. Come back later.");
            return Ok(());
        }
    };

    let mut card = sessions.current_card(&session)?;
    loop {
        print_front(&card);
        let shown_at = Instant::now();

        let Some(answer) = prompt.ask("Enter to reveal, q to quit> ").await? else {
            print_summary(&sessions.cancel(&mut session)?);
            return Ok(());
        };
        if answer == "q" {
            print_summary(&sessions.cancel(&mut session)?);
            return Ok(());
        }

        let revealed = sessions.reveal(&mut session)?;
        print_back(&revealed);
        let response_time_ms = u32::try_from(shown_at.elapsed().as_millis()).ok();

        loop {
            let Some(answer) = prompt.ask("Rate 1 (forgot) to 5 (perfect), q to quit> ").await?
            else {
                print_summary(&sessions.cancel(&mut session)?);
                return Ok(());
            };
            if answer == "q" {
                print_summary(&sessions.cancel(&mut session)?);
                return Ok(());
            }

            let Some(rating) = answer
                .parse::<u8>()
                .ok()
                .and_then(|value| ReviewRating::new(value).ok())
            else {
                println!("Please enter a number from 1 to 5.");
                continue;
            };

            match sessions
                .rate_timed(&mut session, rating.to_quality().value(), response_time_ms)
                .await
            {
                Ok(RateOutcome::Next(next)) => {
                    card = next;
                    break;
                }
                Ok(RateOutcome::Finished(summary)) => {
                    print_summary(&summary);
                    return Ok(());
                }
                Err(SessionError::Persistence(err)) => {
                    eprintln!("could not save the rating ({err}); try again");
                }
                Err(err @ SessionError::NotFound(_)) => {
                    // The session was cancelled; ratings given so far are kept.
                    if let Some(summary) = session.summary() {
                        print_summary(&summary);
                    }
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn print_front(card: &CardView) {
    println!();
    println!(
        "({}/{}) [{}] {}",
        card.progress.position, card.progress.total, card.pair(), card.prompt()
    );
    if let Some(phonetic) = card.phonetic() {
        println!("    {phonetic}");
    }
}

fn print_back(card: &CardView) {
    if let Some(answer) = card.answer() {
        println!("  = {answer}");
    }
    if let Some(example) = card.example() {
        println!("    e.g. {example}");
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!(
        "Reviewed {} card(s), average rating {:.1}, {} min",
        summary.reviewed_count(),
        summary.average_rating_display(),
        summary.elapsed_minutes()
    );
}
