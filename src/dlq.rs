use crate::domain::{DeadLetterQueue, Error, Request};

#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&self, request: Option<&Request>, error: &Error) {
        match request {
            Some(request) => eprintln!("DLQ Report - Request: {} - Error: {}", request, error),
            None => eprintln!("DLQ Report - Error: {}", error),
        }
    }
}
