use data_loader::documents::{load_quiz_questions, load_settings};
use data_loader::{DataLoader, LoaderConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000/".to_string());
    let loader = DataLoader::from_config(LoaderConfig::new(base_url))?;

    // Both loaders run concurrently, the quiz document is fetched once
    let (quiz, settings, _) = tokio::join!(
        load_quiz_questions(&loader),
        load_settings(&loader),
        load_quiz_questions(&loader),
    );

    println!("Loaded {} quiz questions", quiz.questions.len());
    println!("Theme: {}, language: {}", settings.theme, settings.language);
    println!("Loader stats: {:?}", loader.stats());

    loader.clear();
    println!("After clear: {} cached documents", loader.size());

    Ok(())
}
