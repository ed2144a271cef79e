//! Invoice session controller.
//!
//! One session holds one open invoice: its header, line items, payments and
//! the referenced account. The session owns that working state exclusively
//! for as long as the invoice is open; the engine never mutates it behind
//! the session's back.
//!
//! Every operation fetches into locals and assigns to `self` only after its
//! last await. A caller that drops a `load` or `save` future mid-flight
//! (the user closed the view) therefore leaves the session exactly in its
//! prior state - late store results are simply discarded with the future.

use tracing::debug;

use crate::{
    Account, Direction, Engine, EngineError, InvoiceHeader, InvoiceTotals, LineItem,
    LineItemFields, MoneyCents, Payment, invoice_totals,
};

type ResultEngine<T> = Result<T, EngineError>;

/// Where the session is in its lifecycle. The transient Loading/Saving
/// moments exist only inside a pending future; between calls a session is
/// always in one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Loaded,
    Editing,
}

/// Outcome flag of the last save, kept coarse on purpose so the UI can
/// render "saved" / "save failed" / nothing - but header failures and
/// line-item failures stay distinguishable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saved,
    /// The header patch itself failed; no line item was touched.
    HeaderSaveFailed,
    /// The header patch landed but reconciliation failed partway. The
    /// items shown afterwards are re-fetched store truth, not memory.
    ReconcileFailed,
}

/// Result of a navigation intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigateOutcome {
    Moved(i64),
    /// Nothing in that direction; the loaded invoice is unchanged.
    AtBoundary,
}

#[derive(Clone, Debug)]
struct Edits {
    header: InvoiceHeader,
    items: Vec<LineItem>,
    next_local_id: u64,
}

#[derive(Clone, Debug)]
struct Open {
    header: InvoiceHeader,
    items: Vec<LineItem>,
    payments: Vec<Payment>,
    account: Option<Account>,
    edits: Option<Edits>,
}

/// See the module docs.
pub struct InvoiceSession {
    engine: Engine,
    open: Option<Open>,
    save_status: SaveStatus,
}

impl InvoiceSession {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            engine,
            open: None,
            save_status: SaveStatus::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match &self.open {
            None => SessionPhase::Empty,
            Some(open) if open.edits.is_some() => SessionPhase::Editing,
            Some(_) => SessionPhase::Loaded,
        }
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    /// The header as currently shown: pending edits win over loaded state.
    pub fn header(&self) -> Option<&InvoiceHeader> {
        let open = self.open.as_ref()?;
        Some(match &open.edits {
            Some(edits) => &edits.header,
            None => &open.header,
        })
    }

    /// The line items as currently shown: pending edits win.
    pub fn items(&self) -> Option<&[LineItem]> {
        let open = self.open.as_ref()?;
        Some(match &open.edits {
            Some(edits) => edits.items.as_slice(),
            None => open.items.as_slice(),
        })
    }

    pub fn payments(&self) -> Option<&[Payment]> {
        self.open.as_ref().map(|open| open.payments.as_slice())
    }

    pub fn account(&self) -> Option<&Account> {
        self.open.as_ref().and_then(|open| open.account.as_ref())
    }

    /// Totals over the current view (edits included), with any
    /// caller-carried extra fees.
    pub fn totals(&self, extra_fees: &[MoneyCents]) -> Option<InvoiceTotals> {
        let header = self.header()?;
        let items = self.items()?;
        let payments = self.payments()?;
        Some(invoice_totals(header, items, payments, extra_fees))
    }

    /// Load an invoice: header first, then line items, payments and the
    /// referenced account. Replaces whatever was open; pending edits on the
    /// previous invoice are dropped. On any error the session keeps its
    /// prior state.
    pub async fn load(&mut self, ivd: i64) -> ResultEngine<()> {
        let header = self.engine.invoice(ivd).await?;
        let items = self.engine.line_items(ivd).await?;
        let payments = self.engine.payments(ivd).await?;
        let account = self.engine.account(header.account_number).await?;

        self.open = Some(Open {
            header,
            items,
            payments,
            account,
            edits: None,
        });
        self.save_status = SaveStatus::Idle;
        debug!(ivd, "loaded invoice");
        Ok(())
    }

    /// Create a new invoice from a draft header and open it with an empty
    /// line-item set.
    pub async fn create(&mut self, draft: InvoiceHeader) -> ResultEngine<i64> {
        let header = self.engine.create_invoice(draft).await?;
        let account = self.engine.account(header.account_number).await?;
        let ivd = header.ivd;

        self.open = Some(Open {
            header,
            items: Vec::new(),
            payments: Vec::new(),
            account,
            edits: None,
        });
        self.save_status = SaveStatus::Idle;
        Ok(ivd)
    }

    /// Enter the editing phase (no-op when already editing). Pure local
    /// mutation from here on; nothing touches the store until
    /// [`save`](Self::save).
    pub fn begin_edit(&mut self) -> ResultEngine<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| EngineError::NotFound("no invoice loaded".to_string()))?;
        if open.edits.is_none() {
            open.edits = Some(Edits {
                header: open.header.clone(),
                items: open.items.clone(),
                next_local_id: 1,
            });
        }
        Ok(())
    }

    /// Mutable access to the header being edited.
    pub fn header_mut(&mut self) -> Option<&mut InvoiceHeader> {
        self.open
            .as_mut()?
            .edits
            .as_mut()
            .map(|edits| &mut edits.header)
    }

    /// Append a draft line and return its session-local id.
    pub fn add_line(&mut self, fields: LineItemFields) -> Option<u64> {
        let edits = self.open.as_mut()?.edits.as_mut()?;
        let local_id = edits.next_local_id;
        edits.next_local_id += 1;
        edits.items.push(LineItem::Draft { local_id, fields });
        Some(local_id)
    }

    /// Mutable access to one edited line by position.
    pub fn line_mut(&mut self, index: usize) -> Option<&mut LineItemFields> {
        let edits = self.open.as_mut()?.edits.as_mut()?;
        edits.items.get_mut(index).map(LineItem::fields_mut)
    }

    /// Remove one edited line by position. Removing every line is legal:
    /// saving then deletes all persisted rows and leaves the header with
    /// zero line items.
    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        let edits = self.open.as_mut()?.edits.as_mut()?;
        if index < edits.items.len() {
            Some(edits.items.remove(index))
        } else {
            None
        }
    }

    /// Drop pending edits and fall back to the loaded state.
    pub fn discard_edits(&mut self) {
        if let Some(open) = self.open.as_mut() {
            open.edits = None;
        }
    }

    /// Persist the pending edits: header patch first, then line-item
    /// reconciliation.
    ///
    /// The two steps are not atomic together. If the header patch fails,
    /// no line item has been touched and the status is
    /// [`SaveStatus::HeaderSaveFailed`]. If reconciliation fails partway,
    /// the persisted set may match neither the pre-save nor the desired
    /// set, so the session re-fetches store truth for display, keeps the
    /// edits for a retry, and reports [`SaveStatus::ReconcileFailed`].
    pub async fn save(&mut self) -> ResultEngine<()> {
        let (header, items) = {
            let open = self
                .open
                .as_ref()
                .ok_or_else(|| EngineError::NotFound("no invoice loaded".to_string()))?;
            let edits = open.edits.as_ref().ok_or_else(|| {
                EngineError::InvalidAmount("nothing to save: session is not editing".to_string())
            })?;
            (edits.header.clone(), edits.items.clone())
        };

        if let Err(err) = self.engine.update_header(&header).await {
            self.save_status = SaveStatus::HeaderSaveFailed;
            return Err(err);
        }

        match self.engine.reconcile_line_items(header.ivd, &items).await {
            Ok(outcome) => {
                let open = self
                    .open
                    .as_mut()
                    .ok_or_else(|| EngineError::NotFound("no invoice loaded".to_string()))?;
                open.header = header;
                open.items = outcome.items;
                open.edits = None;
                self.save_status = SaveStatus::Saved;
                Ok(())
            }
            Err(err) => {
                // Do not trust local memory: show whatever the store
                // actually holds now, and keep the edits so the user can
                // retry.
                let store_truth = self.engine.line_items(header.ivd).await;
                let open = self
                    .open
                    .as_mut()
                    .ok_or_else(|| EngineError::NotFound("no invoice loaded".to_string()))?;
                if let Ok(items) = store_truth {
                    open.items = items;
                }
                self.save_status = SaveStatus::ReconcileFailed;
                Err(err)
            }
        }
    }

    /// Navigate by invoice id. Going past either end is a no-op that keeps
    /// the current invoice loaded and reports
    /// [`NavigateOutcome::AtBoundary`].
    pub async fn navigate(&mut self, direction: Direction) -> ResultEngine<NavigateOutcome> {
        let current = self.open.as_ref().map(|open| open.header.ivd);
        match self.engine.navigate_invoice(direction, current).await? {
            Some(ivd) => {
                self.load(ivd).await?;
                Ok(NavigateOutcome::Moved(ivd))
            }
            None => Ok(NavigateOutcome::AtBoundary),
        }
    }
}
