// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};

use protos::cisco_grpc_dialout::mdt_dialout_server::MdtDialout;
use protos::cisco_grpc_dialout::MdtDialoutArgs;

use crate::decode::{decode_frame, handle_telemetry_message};
use crate::error::WireError;
use crate::types::VrrpEvent;

type MsgHandler = Arc<dyn Fn(VrrpEvent) + Send + Sync>;
type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// gRPC servicer for handling VRRP telemetry events. A single permit in `connection_slot`
/// enforces the single-peer concurrency limit; the dialout router is always paired with
/// exactly one instance, so a second incoming connection is rejected outright rather than
/// queued.
pub struct VrrpServicer {
    unexpected_paths: Mutex<VecDeque<String>>,
    msg_handler: MsgHandler,
    disconnect_handler: DisconnectHandler,
    connection_slot: Arc<Semaphore>,
}

impl VrrpServicer {
    pub fn new(msg_handler: MsgHandler, disconnect_handler: DisconnectHandler) -> Self {
        VrrpServicer {
            unexpected_paths: Mutex::new(VecDeque::new()),
            msg_handler,
            disconnect_handler,
            connection_slot: Arc::new(Semaphore::new(1)),
        }
    }

    fn handle_frame(&self, frame: &MdtDialoutArgs) -> Result<(), WireError> {
        let Some(msg) = decode_frame(&frame.data)? else {
            return Ok(());
        };
        let events = {
            let mut unexpected_paths = self.unexpected_paths.lock();
            handle_telemetry_message(&msg, &mut unexpected_paths)
        };
        for event in events {
            (self.msg_handler)(event);
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl MdtDialout for VrrpServicer {
    type MdtDialoutStream = Pin<Box<dyn Stream<Item = Result<MdtDialoutArgs, Status>> + Send + 'static>>;

    async fn mdt_dialout(
        &self,
        request: Request<Streaming<MdtDialoutArgs>>,
    ) -> Result<Response<Self::MdtDialoutStream>, Status> {
        let _permit = self
            .connection_slot
            .clone()
            .try_acquire_owned()
            .map_err(|_| Status::resource_exhausted("concurrent limit exceeded"))?;

        let peer = request
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "<unknown>".to_owned());
        log::info!("Connection established with gRPC peer: {peer}");

        let mut stream = request.into_inner();
        loop {
            match stream.message().await {
                Ok(Some(frame)) => {
                    if let Err(err) = self.handle_frame(&frame) {
                        log::error!("Unexpected exception in MdtDialout from gRPC peer {peer}: {err}");
                        (self.disconnect_handler)();
                        return Err(err.into());
                    }
                }
                Ok(None) => {
                    log::info!("Connection closed by gRPC peer {peer}");
                    (self.disconnect_handler)();
                    break;
                }
                Err(status) => {
                    log::info!("Connection lost with gRPC peer {peer}: {status}");
                    (self.disconnect_handler)();
                    return Err(status);
                }
            }
        }

        Ok(Response::new(Box::pin(tokio_stream::empty())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn second_connection_attempt_is_rejected_while_first_holds_the_slot() {
        let servicer = VrrpServicer::new(Arc::new(|_| {}), Arc::new(|| {}));
        let first = servicer.connection_slot.clone().try_acquire_owned();
        assert!(first.is_ok());
        let second = servicer.connection_slot.clone().try_acquire_owned();
        assert!(second.is_err());
    }

    #[test]
    fn handle_frame_invokes_msg_handler_for_each_vrrp_event() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let servicer = VrrpServicer::new(
            Arc::new(move |_event| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(|| {}),
        );

        // An empty-payload frame decodes as a default (empty) Telemetry message with an empty
        // encoding_path, which is neither the VRRP path nor previously-seen, so it is recorded
        // as an unexpected path and yields no events.
        let frame = MdtDialoutArgs {
            data: Bytes::new(),
            req_id: 0,
            errors: String::new(),
        };
        servicer.handle_frame(&frame).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
