use std::io::stdin;

use tracing::info;
use tracing_subscriber::EnvFilter;

use burnout_check::{
    randomized_questions, AnswerSheet, BurnoutResult, Error, Phase, QUESTIONS, TABLES,
};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let questions = randomized_questions(QUESTIONS.questions());
    info!(count = questions.len(), "inventory loaded");

    let mut buffer = String::new();
    let mut sheet = AnswerSheet::default();
    for (number, question) in questions.iter().enumerate() {
        println!();
        println!("{}/{}  {}", number + 1, questions.len(), question.text);
        loop {
            println!("(y/n)");
            buffer.clear();
            stdin().read_line(&mut buffer)?;
            match store_answer(buffer.trim(), question.id, &mut sheet) {
                Ok(()) => break,
                Err(_) => println!("please answer y or n."),
            }
        }
    }

    let result = TABLES.score(&sheet, QUESTIONS.questions());
    info!(
        overall = result.overall_score,
        level = %result.burnout_level,
        "sheet scored"
    );
    print_report(&result);
    Ok(())
}

fn store_answer(value: &str, question_no: u32, sheet: &mut AnswerSheet) -> Result<(), Error> {
    let answer = match value.to_ascii_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => return Err(Error::IllegalAnswer),
    };
    sheet.insert(question_no, answer)
}

fn print_report(result: &BurnoutResult) {
    println!();
    for phase in Phase::ALL {
        let phase_result = result.phase(phase);
        println!(
            "{}: {}/{} ({})",
            phase, phase_result.total, phase_result.max_score, phase_result.level
        );
        for (symptom, symptom_result) in &phase_result.symptoms {
            println!(
                "  {}: {}/{} ({})",
                symptom, symptom_result.score, symptom_result.max_score, symptom_result.level
            );
        }
    }
    println!(
        "overall: {}/84 ({})",
        result.overall_score, result.burnout_level
    );
}
