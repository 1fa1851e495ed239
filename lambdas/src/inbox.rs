use std::sync::Arc;

use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use shared::codec::{Codec, Emitter, ObjectCreated};
use shared::config::{self, Config};
use shared::store::{EventBridgeEmitter, S3Getter, S3Putter};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let cfg = Config::from_env()?;
    let s3 = config::get_s3_client().await;

    let getter = Arc::new(S3Getter::new(s3.clone(), cfg.store_inbox.clone()));
    let putter = Arc::new(S3Putter::new(s3, cfg.store_media.clone()));

    let emitter = match &cfg.profile.sink {
        Some(bus) => {
            let eventbridge = config::get_eventbridge_client().await;
            Some(Arc::new(EventBridgeEmitter::new(eventbridge, bus.clone())) as Arc<dyn Emitter>)
        }
        None => None,
    };

    let codec = Codec::new(&cfg.profile, getter, putter, emitter, cfg.store_media.clone())?;

    run(service_fn(|event| inbox(event, &codec))).await
}

async fn inbox(event: LambdaEvent<S3Event>, codec: &Codec) -> Result<(), Error> {
    for record in event.payload.records {
        let evt = object_created(&record)?;

        if let Err(err) = codec.process(&evt).await {
            error!(
                bucket = %evt.bucket,
                key = %evt.key,
                error = %err,
                "failed to process s3 event"
            );

            // a failed record fails the invocation, the queue redelivers
            return Err(err.into());
        }
    }

    Ok(())
}

fn object_created(record: &S3EventRecord) -> Result<ObjectCreated, Error> {
    let bucket = record
        .s3
        .bucket
        .name
        .clone()
        .ok_or("missing bucket name in s3 event")?;
    let key = record
        .s3
        .object
        .key
        .clone()
        .ok_or("missing object key in s3 event")?;

    Ok(ObjectCreated { bucket, key })
}
