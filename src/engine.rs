use crate::domain::{
    DeadLetterQueue, Error, Request, RequestKind,
    traits::{RequestStream, Storage},
};
use crate::ledger::Ledger;

use futures::StreamExt;
use tracing::info;

/// Outcome counts of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub rejected: usize,
}

/// Feeds a request stream through the ledger, one request at a time.
pub struct Engine<I, S, D>
where
    I: RequestStream,
    S: Storage,
    D: DeadLetterQueue,
{
    ingestion: I,
    ledger: Ledger<S>,
    dlq: D,
}

impl<I, S, D> Engine<I, S, D>
where
    I: RequestStream,
    S: Storage,
    D: DeadLetterQueue,
{
    pub fn new(ingestion: I, ledger: Ledger<S>, dlq: D) -> Self {
        Self {
            ingestion,
            ledger,
            dlq,
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub async fn process(&mut self) -> Result<Summary, Error> {
        let mut res = self.ingestion.stream();
        let mut summary = Summary::default();

        while let Some(req) = res.next().await {
            match req {
                Ok(req) => match self.apply_request(&req).await {
                    Ok(()) => summary.applied += 1,
                    Err(e) => {
                        summary.rejected += 1;
                        self.dlq.report(Some(&req), &e);
                    }
                },
                Err(e) => {
                    summary.rejected += 1;
                    self.dlq.report(None, &e);
                }
            }
        }

        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            "request stream processed"
        );
        Ok(summary)
    }

    async fn apply_request(&self, req: &Request) -> Result<(), Error> {
        match &req.kind {
            RequestKind::Charge(a) => self.ledger.charge(a, req.operator).await.map(|_| ()),
            RequestKind::Deduct(a) => self.ledger.deduct(a, req.operator).await.map(|_| ()),
            RequestKind::Shift(s) => self.ledger.shift(s, req.operator).await.map(|_| ()),
            RequestKind::Transfer(t) => self.ledger.transfer(t, req.operator).await.map(|_| ()),
            RequestKind::CheckIn(c) => self.ledger.check_in(c, req.operator).await.map(|_| ()),
        }
    }
}
