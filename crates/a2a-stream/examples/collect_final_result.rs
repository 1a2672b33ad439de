use a2a_stream::prelude::*;
use futures::TryStreamExt as _;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    let mut client = AgentStreamClient::from_env()?;

    let events: Vec<ParsedEvent> = client
        .send("Give me a one line answer.", None)
        .try_collect()
        .await?;

    let answer = events
        .iter()
        .rev()
        .find(|e| e.artifact_kind() == Some(ArtifactKind::FinalResult))
        .map(|e| e.display_content.as_str())
        .unwrap_or("<no final result>");
    println!("{answer}");
    Ok(())
}
