//! Eve: the adversary on Bob's side.

use tracing::{debug, trace};

use crate::decision::FidelityStrategy;
use crate::error::ProtocolResult;
use crate::message::{Intercept, Message};
use crate::network::Port;
use crate::results::DecisionLog;
use crate::role::{Role, RoleContext, RoleEvent, RoleReport};

use super::EVE;

/// Relays Bob's nonce to Dave and answers Bob from Dave's intercept.
pub struct Eve {
    strategy: FidelityStrategy,
    nonce: Option<u32>,
    intercept: Option<Intercept>,
    log: DecisionLog,
}

impl Eve {
    pub fn new(strategy: FidelityStrategy) -> Self {
        Self {
            strategy,
            nonce: None,
            intercept: None,
            log: DecisionLog::new(),
        }
    }

    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    fn absorb(&mut self, event: RoleEvent, ctx: &mut RoleContext<'_>) {
        match event {
            RoleEvent::Message {
                port: Port::Bob,
                message: Message::Nonce(nonce),
            } => {
                ctx.send(Port::Partner, Message::Nonce(nonce));
                self.nonce = Some(nonce);
            }
            RoleEvent::Message {
                port: Port::Partner,
                message: Message::Intercept(intercept),
            } => self.intercept = Some(intercept),
            other => trace!(node = EVE, event = ?other, "ignored event"),
        }
    }

    fn try_answer(&mut self, ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        let (Some(nonce), Some(intercept)) = (self.nonce, self.intercept) else {
            return Ok(());
        };
        self.nonce = None;
        self.intercept = None;
        let decision = match intercept {
            Intercept::NoPhoton => None,
            Intercept::Measured {
                outcome,
                basis,
                metadata,
            } => self.strategy.respond(outcome, basis, metadata, nonce)?,
        };
        ctx.send(Port::Bob, Message::reply(decision));
        self.log.push(decision);
        debug!(node = EVE, ?decision, "answered Bob");
        Ok(())
    }
}

impl Role for Eve {
    fn name(&self) -> &str {
        EVE
    }

    fn required_ports(&self) -> &'static [Port] {
        &[Port::Bob, Port::Partner]
    }

    fn start(&mut self, _ctx: &mut RoleContext<'_>) -> ProtocolResult<()> {
        Ok(())
    }

    fn handle(
        &mut self,
        events: Vec<RoleEvent>,
        ctx: &mut RoleContext<'_>,
    ) -> ProtocolResult<()> {
        for event in events {
            self.absorb(event, ctx);
        }
        self.try_answer(ctx)
    }

    fn report(&self) -> RoleReport {
        RoleReport::Player(self.log.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::Basis;
    use crate::message::Payload;
    use crate::role::Action;
    use crate::time::SimTime;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sent(actions: Vec<Action>) -> Vec<(Port, Message)> {
        actions
            .into_iter()
            .filter_map(|a| match a {
                Action::Send {
                    port,
                    payload: Payload::Classical(m),
                } => Some((port, m)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_nonce_is_relayed_before_intercept_arrives() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut eve = Eve::new(FidelityStrategy::new(1, 0.0));
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        eve.handle(
            vec![RoleEvent::Message {
                port: Port::Bob,
                message: Message::Nonce(1),
            }],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(sent(ctx.into_actions()), vec![(Port::Partner, Message::Nonce(1))]);
        assert!(eve.log().is_empty());
    }

    #[test]
    fn test_matching_basis_keeps_daves_outcome() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut eve = Eve::new(FidelityStrategy::new(1, 0.0));
        let basis = Basis { theta: 0, phi: 0 };
        let intercept = Intercept::Measured {
            outcome: true,
            basis,
            metadata: basis.conceal(1, 1),
        };
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        eve.handle(
            vec![
                RoleEvent::Message {
                    port: Port::Partner,
                    message: Message::Intercept(intercept),
                },
                RoleEvent::Message {
                    port: Port::Bob,
                    message: Message::Nonce(1),
                },
            ],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(
            sent(ctx.into_actions()),
            vec![
                (Port::Partner, Message::Nonce(1)),
                (Port::Bob, Message::Measurement(true))
            ]
        );
        assert_eq!(eve.log().entries(), &[Some(true)]);
    }

    #[test]
    fn test_missing_photon_abstains() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut eve = Eve::new(FidelityStrategy::new(2, 0.1));
        let mut ctx = RoleContext::new(SimTime::ZERO, &mut rng);
        eve.handle(
            vec![
                RoleEvent::Message {
                    port: Port::Bob,
                    message: Message::Nonce(3),
                },
                RoleEvent::Message {
                    port: Port::Partner,
                    message: Message::Intercept(Intercept::NoPhoton),
                },
            ],
            &mut ctx,
        )
        .unwrap();
        let replies = sent(ctx.into_actions());
        assert_eq!(replies.last(), Some(&(Port::Bob, Message::NoPhoton)));
        assert_eq!(eve.log().entries(), &[None]);
    }
}
