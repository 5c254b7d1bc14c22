/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use courier::prelude::*;
use tokio::sync::mpsc::Receiver;

// --- Messages ---

/// Broadcast when a new data point is available.
#[courier_message(tag = "NEW_DATA")]
struct NewData {
    value: i32,
}

/// Broadcast by the aggregator router after every update.
#[courier_message]
struct SumUpdated {
    sum: i32,
}

/// Prints whatever `who` has received so far.
fn drain(who: &str, receiver: &mut Receiver<Envelope>) {
    while let Ok(envelope) = receiver.try_recv() {
        println!(
            "{who} received {} from {}: {}",
            envelope.message_type(),
            envelope.source(),
            envelope.payload().map(ToString::to_string).unwrap_or_default()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Launch the runtime.
    let runtime = CourierApp::launch_async().await;
    let _guard = courier::logging::init(&runtime.config().logging);
    let broadcaster = runtime.broadcaster("collector");

    // 2. Two tabs listen on channels; a third has already been closed.
    let (tab_one, mut tab_one_rx) = runtime.channel_endpoint("tab-1");
    let (tab_two, mut tab_two_rx) = runtime.channel_endpoint("tab-2");
    let (closed_tab, closed_rx) = runtime.channel_endpoint("tab-3");
    drop(closed_rx);
    runtime.endpoints().register(tab_one);
    runtime.endpoints().register(tab_two);
    runtime.endpoints().register(closed_tab);

    // 3. A router is an endpoint too. The aggregator sums data points and
    //    rebroadcasts its running total on a registry of its own.
    let totals = EndpointRegistry::new();
    let (dashboard, mut dashboard_rx) = runtime.channel_endpoint("dashboard");
    totals.register(dashboard);
    let sums = Broadcaster::new("aggregator", totals);

    let total = Arc::new(AtomicI32::new(0));
    let mut aggregator = runtime.new_router("aggregator");
    aggregator.on::<NewData, _, _>(move |data, _sender| {
        let total = Arc::clone(&total);
        let sums = sums.clone();
        async move {
            let sum = total.fetch_add(data.value, Ordering::SeqCst) + data.value;
            sums.broadcast_message(&SumUpdated { sum }).await?;
            Ok::<_, HandlerError>(())
        }
    })?;
    let aggregator = runtime.start_router(aggregator);
    runtime.endpoints().register(aggregator);

    // 4. Fan out a few data points. The closed tab is skipped silently.
    for value in [3, 5, 8] {
        let delivered = broadcaster.broadcast_message(&NewData { value }).await?;
        println!("NEW_DATA {value} delivered to {delivered} endpoints");
    }

    // 5. Give the aggregator a moment, then see what everyone received.
    tokio::time::sleep(Duration::from_millis(50)).await;
    drain("tab-1", &mut tab_one_rx);
    drain("tab-2", &mut tab_two_rx);
    drain("dashboard", &mut dashboard_rx);

    runtime.shutdown_all().await?;
    Ok(())
}
