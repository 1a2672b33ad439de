use a2a_stream::prelude::*;
use futures::StreamExt as _;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    a2a_stream::init_observability();
    let mut client = AgentStreamClient::from_env()?;

    let mut events = client.send("Stream a short status report.", None);
    while let Some(event) = events.next().await {
        let event = event?;
        match event.event_type {
            EventType::Artifact if event.should_append => print!("{}", event.display_content),
            EventType::Artifact => print!("\n{}", event.display_content),
            _ => println!("\n[{}] {}", event.event_type, event.display_content),
        }
    }
    println!();
    Ok(())
}
